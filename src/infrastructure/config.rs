use crate::domain::session_timer::{DEFAULT_MAX_SESSIONS, TimerDurations, TimerMode};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TIMER_JSON: &str = "timer.json";
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub timer: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub mode: TimerMode,
    pub max_sessions: u32,
    pub custom: TimerDurations,
    pub tick_interval_ms: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            mode: TimerMode::Pomodoro25,
            max_sessions: DEFAULT_MAX_SESSIONS,
            custom: TimerDurations::custom_default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl TimerSettings {
    /// Durations for `mode`, carrying the configured cycle length.
    pub fn durations_for(&self, mode: TimerMode) -> TimerDurations {
        let base = match mode {
            TimerMode::Pomodoro25 => TimerDurations::pomodoro_25(),
            TimerMode::Pomodoro50 => TimerDurations::pomodoro_50(),
            TimerMode::Custom => self.custom,
        };
        TimerDurations {
            max_sessions: self.max_sessions,
            ..base
        }
    }

    pub fn durations(&self) -> TimerDurations {
        self.durations_for(self.mode)
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "StudentCalendar",
                "timezone": "UTC"
            }),
        ),
        (
            TIMER_JSON,
            serde_json::json!({
                "schema": 1,
                "mode": "pomodoro_25",
                "maxSessionsBeforeLongBreak": DEFAULT_MAX_SESSIONS,
                "tickIntervalMs": DEFAULT_TICK_INTERVAL_MS,
                "custom": {
                    "focusMinutes": 30,
                    "shortBreakMinutes": 5,
                    "longBreakMinutes": 10
                }
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            write_config(&path, &value)?;
        }
    }
    Ok(())
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    let bundle = ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        timer: read_config(&config_dir.join(TIMER_JSON))?,
    };
    parse_timer_settings(&bundle.timer, &config_dir.join(TIMER_JSON))?;
    Ok(bundle)
}

pub fn read_timezone(config_dir: &Path) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_timer_settings(config_dir: &Path) -> Result<TimerSettings, InfraError> {
    let path = config_dir.join(TIMER_JSON);
    let timer = read_config(&path)?;
    parse_timer_settings(&timer, &path)
}

fn parse_timer_settings(timer: &serde_json::Value, path: &Path) -> Result<TimerSettings, InfraError> {
    let defaults = TimerSettings::default();
    let invalid = |message: String| InfraError::InvalidConfig(format!("{message} in {}", path.display()));

    let mode = match timer.get("mode") {
        Some(value) => {
            let raw = value
                .as_str()
                .ok_or_else(|| invalid("mode must be a string".to_string()))?;
            TimerMode::parse(raw).map_err(&invalid)?
        }
        None => defaults.mode,
    };
    let max_sessions = match optional_u64(timer, "maxSessionsBeforeLongBreak").map_err(&invalid)? {
        Some(value) => u32::try_from(value)
            .map_err(|_| invalid("maxSessionsBeforeLongBreak is out of range".to_string()))?,
        None => defaults.max_sessions,
    };
    let tick_interval_ms = optional_u64(timer, "tickIntervalMs")
        .map_err(&invalid)?
        .unwrap_or(defaults.tick_interval_ms);
    if tick_interval_ms == 0 {
        return Err(invalid("tickIntervalMs must be > 0".to_string()));
    }

    let custom_section = match timer.get("custom") {
        Some(section) if section.is_object() => Some(section),
        Some(_) => return Err(invalid("custom must be an object".to_string())),
        None => None,
    };
    let custom_minutes = |key: &str, fallback_millis: u64| -> Result<u64, InfraError> {
        let configured = match custom_section {
            Some(section) => optional_u64(section, key).map_err(&invalid)?,
            None => None,
        };
        Ok(configured.unwrap_or(fallback_millis / 60_000))
    };
    let custom = TimerDurations::from_minutes(
        custom_minutes("focusMinutes", defaults.custom.focus_millis)?,
        custom_minutes("shortBreakMinutes", defaults.custom.short_break_millis)?,
        custom_minutes("longBreakMinutes", defaults.custom.long_break_millis)?,
        max_sessions,
    )
    .map_err(&invalid)?;
    custom.validate().map_err(&invalid)?;

    Ok(TimerSettings {
        mode,
        max_sessions,
        custom,
        tick_interval_ms,
    })
}

/// Absent keys are `None`; present keys must hold a non-negative integer.
fn optional_u64(object: &serde_json::Value, key: &str) -> Result<Option<u64>, String> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| format!("{key} must be a non-negative integer")),
    }
}

pub fn save_timer_mode(config_dir: &Path, mode: TimerMode) -> Result<(), InfraError> {
    let path = config_dir.join(TIMER_JSON);
    let mut timer = read_config(&path)?;
    let object = timer.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "mode".to_string(),
        serde_json::Value::String(mode.as_str().to_string()),
    );
    write_config(&path, &timer)
}
