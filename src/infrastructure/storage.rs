use crate::infrastructure::error::InfraError;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    open_database(path).map(|_| ())
}

/// Opens the store, creating missing tables first.
pub fn open_database(path: &Path) -> Result<Connection, InfraError> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_database_is_repeatable() {
        let path = std::env::temp_dir().join(format!(
            "studentcal-storage-test-{}.sqlite",
            std::process::id()
        ));
        initialize_database(&path).expect("first init");
        initialize_database(&path).expect("second init");

        let connection = open_database(&path).expect("open");
        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_tasks'",
                [],
                |row| row.get(0),
            )
            .expect("query schema");
        assert_eq!(tables, 1);
        drop(connection);
        let _ = std::fs::remove_file(&path);
    }
}
