pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    add_task_impl, build_calendar_impl, current_month_impl, delete_task_impl,
    get_timer_state_impl, list_tasks_impl, mark_task_done_impl, pause_timer_impl,
    reset_timer_impl, select_focus_task_impl, set_timer_mode_impl, skip_timer_impl,
    start_timer_impl, tasks_for_day_impl, tick_timer_impl, update_task_impl,
};
use domain::calendar_grid::MonthRef;
use domain::models::Task;
use serde::Serialize;
use std::path::PathBuf;

pub use application::commands::{
    AppState, CalendarViewResponse, DayAgenda, TaskInput, TimerStateResponse,
};
pub use application::task_events::{TaskChange, TaskChangeKind, TaskChangeNotifier};
pub use application::ticker::TimerTicker;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub workspace_root: String,
    pub database_path: String,
}

/// Prepares the workspace layout, defaulting to the current directory.
pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

pub fn list_tasks(state: &AppState, user_key: Option<String>) -> Result<Vec<Task>, String> {
    list_tasks_impl(state, user_key).map_err(|error| state.command_error("list_tasks", &error))
}

pub fn add_task(
    state: &AppState,
    user_key: Option<String>,
    input: TaskInput,
) -> Result<Task, String> {
    add_task_impl(state, user_key, input).map_err(|error| state.command_error("add_task", &error))
}

pub fn update_task(
    state: &AppState,
    user_key: Option<String>,
    original: Task,
    input: TaskInput,
) -> Result<Task, String> {
    update_task_impl(state, user_key, original, input)
        .map_err(|error| state.command_error("update_task", &error))
}

pub fn mark_task_done(
    state: &AppState,
    user_key: Option<String>,
    task: Task,
) -> Result<Task, String> {
    mark_task_done_impl(state, user_key, task)
        .map_err(|error| state.command_error("mark_task_done", &error))
}

pub fn delete_task(state: &AppState, user_key: Option<String>, task: Task) -> Result<bool, String> {
    delete_task_impl(state, user_key, task).map_err(|error| state.command_error("delete_task", &error))
}

pub fn tasks_for_day(
    state: &AppState,
    user_key: Option<String>,
    date: String,
) -> Result<DayAgenda, String> {
    tasks_for_day_impl(state, user_key, date)
        .map_err(|error| state.command_error("tasks_for_day", &error))
}

pub fn current_month(state: &AppState) -> Result<MonthRef, String> {
    current_month_impl(state).map_err(|error| state.command_error("current_month", &error))
}

pub fn build_calendar(
    state: &AppState,
    user_key: Option<String>,
    year: i32,
    month: u32,
    selected_index: Option<usize>,
) -> Result<CalendarViewResponse, String> {
    build_calendar_impl(state, user_key, year, month, selected_index)
        .map_err(|error| state.command_error("build_calendar", &error))
}

pub fn get_timer_state(state: &AppState) -> Result<TimerStateResponse, String> {
    get_timer_state_impl(state).map_err(|error| state.command_error("get_timer_state", &error))
}

pub fn start_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    start_timer_impl(state).map_err(|error| state.command_error("start_timer", &error))
}

pub fn pause_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    pause_timer_impl(state).map_err(|error| state.command_error("pause_timer", &error))
}

pub fn reset_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    reset_timer_impl(state).map_err(|error| state.command_error("reset_timer", &error))
}

pub fn skip_timer(state: &AppState) -> Result<TimerStateResponse, String> {
    skip_timer_impl(state).map_err(|error| state.command_error("skip_timer", &error))
}

pub fn tick_timer(state: &AppState, elapsed_millis: u64) -> Result<TimerStateResponse, String> {
    tick_timer_impl(state, elapsed_millis).map_err(|error| state.command_error("tick_timer", &error))
}

pub fn set_timer_mode(state: &AppState, mode: String) -> Result<TimerStateResponse, String> {
    set_timer_mode_impl(state, mode).map_err(|error| state.command_error("set_timer_mode", &error))
}

pub fn select_focus_task(
    state: &AppState,
    user_key: Option<String>,
    index: Option<usize>,
) -> Result<TimerStateResponse, String> {
    select_focus_task_impl(state, user_key, index)
        .map_err(|error| state.command_error("select_focus_task", &error))
}
