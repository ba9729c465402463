use crate::domain::models::Task;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_USER_KEY: &str = "default";

pub fn normalize_user_key(user_key: &str) -> String {
    let normalized = user_key.trim();
    if normalized.is_empty() {
        DEFAULT_USER_KEY.to_string()
    } else {
        normalized.to_string()
    }
}

/// Per-user task collection, always read and written as a whole.
pub trait TaskStore: Send + Sync {
    fn load(&self, user_key: &str) -> Result<Vec<Task>, InfraError>;
    fn save(&self, user_key: &str, tasks: &[Task]) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }
}

impl TaskStore for SqliteTaskStore {
    fn load(&self, user_key: &str) -> Result<Vec<Task>, InfraError> {
        let user_key = normalize_user_key(user_key);
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM user_tasks WHERE user_key = ?1",
                params![user_key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&payload)?)
    }

    fn save(&self, user_key: &str, tasks: &[Task]) -> Result<(), InfraError> {
        let user_key = normalize_user_key(user_key);
        let payload = serde_json::to_string(tasks)?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO user_tasks (user_key, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_key) DO UPDATE SET
               payload = excluded.payload,
               updated_at = excluded.updated_at",
            params![user_key, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl TaskStore for InMemoryTaskStore {
    fn load(&self, user_key: &str) -> Result<Vec<Task>, InfraError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("task store lock poisoned: {error}")))?;
        match blobs.get(&normalize_user_key(user_key)) {
            Some(payload) => Ok(serde_json::from_str(payload)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, user_key: &str, tasks: &[Task]) -> Result<(), InfraError> {
        let payload = serde_json::to_string(tasks)?;
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("task store lock poisoned: {error}")))?;
        blobs.insert(normalize_user_key(user_key), payload);
        Ok(())
    }
}
