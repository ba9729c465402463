use serde::{Deserialize, Serialize};

pub const NO_LOCATION_PLACEHOLDER: &str = "No location";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("low") {
            Ok(Self::Low)
        } else if value.eq_ignore_ascii_case("medium") {
            Ok(Self::Medium)
        } else if value.eq_ignore_ascii_case("high") {
            Ok(Self::High)
        } else {
            Err(format!("unsupported priority: {value}"))
        }
    }
}

/// A user task as persisted in the per-user blob.
///
/// Tasks carry no id: two tasks with equal fields are the same task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "isCompleted", default)]
    pub completed: bool,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        validate_non_empty(&self.date, "task.date")?;
        validate_non_empty(&self.time, "task.time")?;
        Ok(())
    }

    pub fn display_location(&self) -> &str {
        if self.location.trim().is_empty() {
            NO_LOCATION_PLACEHOLDER
        } else {
            &self.location
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DaySummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub progress_percent: u8,
}

impl DaySummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let progress_percent = if total == 0 {
            0
        } else {
            (completed * 100 / total) as u8
        };
        Self {
            total,
            completed,
            in_progress: total - completed,
            progress_percent,
        }
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
