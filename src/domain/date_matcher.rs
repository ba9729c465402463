use crate::domain::models::{DaySummary, Task};

/// Normalizes a task date to the `yyyy-mm-dd` key used by the calendar.
///
/// `d/m/y` input is reordered and zero-padded, anything containing `-` is
/// taken as already canonical. Parts are not checked for numeric content.
pub fn normalize(raw: &str) -> Option<String> {
    if raw.contains('/') {
        let parts = raw.split('/').collect::<Vec<_>>();
        let [day, month, year] = parts.as_slice() else {
            return None;
        };
        return Some(format!("{year}-{:0>2}-{:0>2}", month, day));
    }
    if raw.contains('-') {
        return Some(raw.to_string());
    }
    None
}

pub fn matches_day(raw: &str, date_key: &str) -> bool {
    normalize(raw).is_some_and(|normalized| normalized == date_key)
}

pub fn items_for_day(date_key: &str, items: &[Task]) -> Vec<Task> {
    items
        .iter()
        .filter(|task| matches_day(&task.date, date_key))
        .cloned()
        .collect()
}

pub fn day_summary(date_key: &str, items: &[Task]) -> DaySummary {
    DaySummary::from_tasks(&items_for_day(date_key, items))
}
