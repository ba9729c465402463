use crate::application::bootstrap::bootstrap_workspace;
use crate::application::task_events::{TaskChange, TaskChangeKind, TaskChangeNotifier};
use crate::domain::calendar_grid::{build_grid, date_key, item_date_keys, CalendarGrid, MonthRef};
use crate::domain::date_matcher::{items_for_day, normalize};
use crate::domain::models::{DaySummary, Priority, Task};
use crate::domain::session_timer::{
    SessionIndicator, SessionTimer, SessionTransition, TimerMode,
};
use crate::infrastructure::clock::{local_today, parse_timezone, system_now, NowProvider};
use crate::infrastructure::config::{read_timer_settings, read_timezone, save_timer_mode, TimerSettings};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::{normalize_user_key, SqliteTaskStore, TaskStore};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    task_store: Arc<dyn TaskStore>,
    notifier: TaskChangeNotifier,
    now_provider: NowProvider,
    runtime: Mutex<RuntimeState>,
    task_writes: Mutex<()>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let timer_settings = read_timer_settings(&bootstrap.config_dir)?;

        Ok(Self {
            task_store: Arc::new(SqliteTaskStore::new(&bootstrap.database_path)),
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path,
            logs_dir: bootstrap.logs_dir,
            notifier: TaskChangeNotifier::default(),
            now_provider: system_now(),
            runtime: Mutex::new(RuntimeState::new(timer_settings)),
            task_writes: Mutex::new(()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn with_task_store(mut self, task_store: Arc<dyn TaskStore>) -> Self {
        self.task_store = task_store;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn notifier(&self) -> &TaskChangeNotifier {
        &self.notifier
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> Result<NaiveDate, InfraError> {
        let timezone = read_timezone(&self.config_dir)?;
        let parsed = parse_timezone(timezone.as_deref());
        if timezone.is_some() && parsed.is_none() {
            self.log_error(
                "today",
                &format!("unknown timezone {:?}, falling back to UTC", timezone),
            );
        }
        Ok(local_today((self.now_provider)(), parsed))
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug)]
struct RuntimeState {
    timer_settings: TimerSettings,
    timer: SessionTimer,
    focus_task: Option<Task>,
    /// Instant up to which running time has been taken off the timer.
    accounted_until: Option<Instant>,
}

impl RuntimeState {
    fn new(timer_settings: TimerSettings) -> Self {
        Self {
            timer: SessionTimer::new(timer_settings.durations()),
            timer_settings,
            focus_task: None,
            accounted_until: None,
        }
    }
}

/// Fields of a task as entered by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub location: Option<String>,
    pub date: String,
    pub time: String,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayAgenda {
    pub date_key: String,
    pub is_today: bool,
    pub tasks: Vec<Task>,
    pub summary: DaySummary,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarViewResponse {
    pub label: String,
    pub previous_label: String,
    pub next_label: String,
    pub grid: CalendarGrid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerStateResponse {
    pub mode: String,
    pub session_type: String,
    pub running: bool,
    pub remaining_millis: u64,
    pub total_millis: u64,
    pub remaining_label: String,
    pub progress_fraction: f64,
    pub completed_focus_count: u32,
    pub max_sessions: u32,
    pub next_session_type: String,
    pub indicators: Vec<SessionIndicator>,
    pub focus_task: Option<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<SessionTransition>,
}

pub fn list_tasks_impl(state: &AppState, user_key: Option<String>) -> Result<Vec<Task>, InfraError> {
    let user_key = resolve_user_key(user_key);
    Ok(load_tasks_or_empty(state, &user_key))
}

pub fn add_task_impl(
    state: &AppState,
    user_key: Option<String>,
    input: TaskInput,
) -> Result<Task, InfraError> {
    let user_key = resolve_user_key(user_key);
    let task = task_from_input(input, false)?;

    mutate_tasks(state, &user_key, TaskChangeKind::Added, |tasks| {
        tasks.push(task.clone());
        Ok(Some(()))
    })?;

    state.log_info(
        "add_task",
        &format!("added task '{}' for user={user_key}", task.title),
    );
    Ok(task)
}

pub fn update_task_impl(
    state: &AppState,
    user_key: Option<String>,
    original: Task,
    input: TaskInput,
) -> Result<Task, InfraError> {
    let user_key = resolve_user_key(user_key);
    let updated = task_from_input(input, original.completed)?;
    mutate_tasks(state, &user_key, TaskChangeKind::Updated, |tasks| {
        let slot = find_task(tasks, &original)?;
        *slot = updated.clone();
        Ok(Some(()))
    })?;

    state.log_info(
        "update_task",
        &format!("updated task '{}' for user={user_key}", updated.title),
    );
    Ok(updated)
}

pub fn mark_task_done_impl(
    state: &AppState,
    user_key: Option<String>,
    task: Task,
) -> Result<Task, InfraError> {
    let user_key = resolve_user_key(user_key);
    let completed = mutate_tasks(state, &user_key, TaskChangeKind::Completed, |tasks| {
        let slot = find_task(tasks, &task)?;
        slot.completed = true;
        Ok(Some(slot.clone()))
    })?
    .ok_or_else(|| InfraError::NotFound(format!("task '{}'", task.title)))?;

    state.log_info(
        "mark_task_done",
        &format!("completed task '{}' for user={user_key}", completed.title),
    );
    Ok(completed)
}

pub fn delete_task_impl(
    state: &AppState,
    user_key: Option<String>,
    task: Task,
) -> Result<bool, InfraError> {
    let user_key = resolve_user_key(user_key);
    let deleted = mutate_tasks(state, &user_key, TaskChangeKind::Deleted, |tasks| {
        Ok(tasks
            .iter()
            .position(|candidate| *candidate == task)
            .map(|position| tasks.remove(position)))
    })?;
    if deleted.is_none() {
        return Ok(false);
    }

    state.log_info(
        "delete_task",
        &format!("deleted task '{}' for user={user_key}", task.title),
    );
    Ok(true)
}

pub fn tasks_for_day_impl(
    state: &AppState,
    user_key: Option<String>,
    date: String,
) -> Result<DayAgenda, InfraError> {
    let user_key = resolve_user_key(user_key);
    let key = normalize(date.trim())
        .ok_or_else(|| InfraError::InvalidInput(format!("unrecognized date: {date}")))?;

    let tasks = items_for_day(&key, &load_tasks_or_empty(state, &user_key));
    let is_today = date_key(state.today()?) == key;
    Ok(DayAgenda {
        summary: DaySummary::from_tasks(&tasks),
        date_key: key,
        is_today,
        tasks,
    })
}

pub fn current_month_impl(state: &AppState) -> Result<MonthRef, InfraError> {
    Ok(MonthRef::containing(state.today()?))
}

pub fn build_calendar_impl(
    state: &AppState,
    user_key: Option<String>,
    year: i32,
    month: u32,
    selected_index: Option<usize>,
) -> Result<CalendarViewResponse, InfraError> {
    let user_key = resolve_user_key(user_key);
    let month = MonthRef::new(year, month).map_err(InfraError::InvalidInput)?;
    let today = state.today()?;
    let item_keys = item_date_keys(&load_tasks_or_empty(state, &user_key));

    let grid = build_grid(month, today, &item_keys, selected_index).map_err(InfraError::InvalidInput)?;
    let previous = month.shift(-1).map_err(InfraError::InvalidInput)?;
    let next = month.shift(1).map_err(InfraError::InvalidInput)?;
    Ok(CalendarViewResponse {
        label: month.label().map_err(InfraError::InvalidInput)?,
        previous_label: previous.short_label().map_err(InfraError::InvalidInput)?,
        next_label: next.short_label().map_err(InfraError::InvalidInput)?,
        grid,
    })
}

pub fn get_timer_state_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(to_timer_state_response(&runtime, None))
}

pub fn start_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    if !runtime.timer.is_running() {
        runtime.timer.start();
        runtime.accounted_until = Some(Instant::now());
        state.log_info(
            "start_timer",
            &format!(
                "started {} session with {}ms left",
                runtime.timer.session_type().as_str(),
                runtime.timer.remaining_millis()
            ),
        );
    }
    Ok(to_timer_state_response(&runtime, None))
}

pub fn pause_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    if runtime.timer.is_running() {
        runtime.timer.pause();
        state.log_info("pause_timer", "paused study timer");
    }
    runtime.accounted_until = None;
    Ok(to_timer_state_response(&runtime, None))
}

pub fn reset_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.reset();
    runtime.accounted_until = None;
    state.log_info("reset_timer", "reset current session");
    Ok(to_timer_state_response(&runtime, None))
}

pub fn skip_timer_impl(state: &AppState) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let transition = runtime.timer.skip();
    runtime.accounted_until = None;
    log_transition(state, "skip_timer", &transition);
    Ok(to_timer_state_response(&runtime, Some(transition)))
}

pub fn tick_timer_impl(state: &AppState, elapsed_millis: u64) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let transition = apply_elapsed(state, &mut runtime, elapsed_millis);
    Ok(to_timer_state_response(&runtime, transition))
}

/// Takes off the running time between the last accounted instant and `now`.
///
/// Time spent paused or stopped is never counted: the baseline is set when
/// the timer starts and dropped when it stops.
pub fn advance_timer_impl(state: &AppState, now: Instant) -> Result<TimerStateResponse, InfraError> {
    let mut runtime = lock_runtime(state)?;
    if !runtime.timer.is_running() {
        runtime.accounted_until = None;
        return Ok(to_timer_state_response(&runtime, None));
    }

    let Some(since) = runtime.accounted_until else {
        runtime.accounted_until = Some(now);
        return Ok(to_timer_state_response(&runtime, None));
    };
    let elapsed_millis =
        u64::try_from(now.saturating_duration_since(since).as_millis()).unwrap_or(u64::MAX);
    runtime.accounted_until = since.checked_add(Duration::from_millis(elapsed_millis));
    let transition = apply_elapsed(state, &mut runtime, elapsed_millis);
    Ok(to_timer_state_response(&runtime, transition))
}

fn apply_elapsed(
    state: &AppState,
    runtime: &mut RuntimeState,
    elapsed_millis: u64,
) -> Option<SessionTransition> {
    let transition = runtime.timer.tick(elapsed_millis);
    if !runtime.timer.is_running() {
        runtime.accounted_until = None;
    }
    if let Some(transition) = &transition {
        log_transition(state, "tick_timer", transition);
    }
    transition
}

pub fn set_timer_mode_impl(state: &AppState, mode: String) -> Result<TimerStateResponse, InfraError> {
    let mode = TimerMode::parse(&mode).map_err(InfraError::InvalidInput)?;
    save_timer_mode(state.config_dir(), mode)?;

    let mut runtime = lock_runtime(state)?;
    runtime.timer_settings.mode = mode;
    let durations = runtime.timer_settings.durations();
    runtime.timer.set_durations(durations);
    runtime.accounted_until = None;

    state.log_info("set_timer_mode", &format!("switched to mode={}", mode.as_str()));
    Ok(to_timer_state_response(&runtime, None))
}

pub fn select_focus_task_impl(
    state: &AppState,
    user_key: Option<String>,
    index: Option<usize>,
) -> Result<TimerStateResponse, InfraError> {
    let user_key = resolve_user_key(user_key);
    let tasks = load_tasks_or_empty(state, &user_key);
    let focus_task = match index {
        Some(index) => Some(tasks.get(index).cloned().ok_or_else(|| {
            InfraError::InvalidInput(format!(
                "task index {index} out of range for {} tasks",
                tasks.len()
            ))
        })?),
        None => tasks.first().cloned(),
    };

    let mut runtime = lock_runtime(state)?;
    runtime.focus_task = focus_task;
    Ok(to_timer_state_response(&runtime, None))
}

pub fn timer_tick_interval(state: &AppState) -> Result<Duration, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(Duration::from_millis(runtime.timer_settings.tick_interval_ms))
}

fn resolve_user_key(user_key: Option<String>) -> String {
    normalize_user_key(user_key.as_deref().unwrap_or_default())
}

/// Unreadable blobs read as empty; a mutating command then overwrites them on save.
fn load_tasks_or_empty(state: &AppState, user_key: &str) -> Vec<Task> {
    match state.task_store.load(user_key) {
        Ok(tasks) => tasks,
        Err(error) => {
            state.log_error(
                "load_tasks",
                &format!("treating tasks of user={user_key} as empty: {error}"),
            );
            Vec::new()
        }
    }
}

/// Runs one load-modify-save cycle for `user_key` under the task write lock.
///
/// `mutate` returns `None` to leave the collection unsaved. Subscribers are
/// told about the change after the lock is released.
fn mutate_tasks<T>(
    state: &AppState,
    user_key: &str,
    kind: TaskChangeKind,
    mutate: impl FnOnce(&mut Vec<Task>) -> Result<Option<T>, InfraError>,
) -> Result<Option<T>, InfraError> {
    let (outcome, task_count) = {
        let _guard = state
            .task_writes
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("task lock poisoned: {error}")))?;
        let mut tasks = load_tasks_or_empty(state, user_key);
        let Some(outcome) = mutate(&mut tasks)? else {
            return Ok(None);
        };
        state.task_store.save(user_key, &tasks)?;
        (outcome, tasks.len())
    };

    notify_change(state, user_key, kind, task_count);
    Ok(Some(outcome))
}

fn find_task<'a>(tasks: &'a mut [Task], wanted: &Task) -> Result<&'a mut Task, InfraError> {
    tasks
        .iter_mut()
        .find(|candidate| **candidate == *wanted)
        .ok_or_else(|| InfraError::NotFound(format!("task '{}'", wanted.title)))
}

/// The change is already saved, so a failed broadcast is only logged.
fn notify_change(state: &AppState, user_key: &str, kind: TaskChangeKind, task_count: usize) {
    let change = TaskChange {
        user_key: user_key.to_string(),
        kind,
        task_count,
    };
    if let Err(error) = state.notifier.notify(&change) {
        state.log_error(
            "notify_task_change",
            &format!("saved change for user={user_key} was not broadcast: {error}"),
        );
    }
}

fn task_from_input(input: TaskInput, completed: bool) -> Result<Task, InfraError> {
    let priority = match input.priority.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Priority::parse(value).map_err(InfraError::InvalidInput)?,
        _ => Priority::default(),
    };
    let task = Task {
        title: input.title.trim().to_string(),
        location: input
            .location
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        date: input.date.trim().to_string(),
        time: input.time.trim().to_string(),
        priority,
        completed,
    };
    task.validate().map_err(InfraError::InvalidInput)?;
    Ok(task)
}

fn log_transition(state: &AppState, command: &str, transition: &SessionTransition) {
    state.log_info(
        command,
        &format!(
            "session {} finished, next {} (completed focus sessions: {})",
            transition.from.as_str(),
            transition.to.as_str(),
            transition.completed_focus_count
        ),
    );
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn to_timer_state_response(
    runtime: &RuntimeState,
    transition: Option<SessionTransition>,
) -> TimerStateResponse {
    let timer = &runtime.timer;
    TimerStateResponse {
        mode: runtime.timer_settings.mode.as_str().to_string(),
        session_type: timer.session_type().as_str().to_string(),
        running: timer.is_running(),
        remaining_millis: timer.remaining_millis(),
        total_millis: timer.total_millis(),
        remaining_label: timer.remaining_label(),
        progress_fraction: timer.progress_fraction(),
        completed_focus_count: timer.completed_focus_count(),
        max_sessions: timer.durations().max_sessions,
        next_session_type: timer.next_session_type().as_str().to_string(),
        indicators: timer.indicators(),
        focus_task: runtime.focus_task.clone(),
        transition,
    }
}
