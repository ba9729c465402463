use crate::application::commands::{advance_timer_impl, timer_tick_interval, AppState};
use crate::infrastructure::error::InfraError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Background task feeding wall-clock time into the shared session timer.
///
/// Each tick hands the current instant to the command layer, which takes off
/// only the time the timer has been running. A delayed wake-up is coalesced
/// into one larger step instead of being lost.
pub struct TimerTicker {
    handle: JoinHandle<()>,
}

impl TimerTicker {
    pub fn spawn(state: Arc<AppState>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if let Err(error) = advance_timer_impl(&state, Instant::now()) {
                    state.log_error("timer_ticker", &error.to_string());
                }
            }
        });

        Self { handle }
    }

    /// Spawns with the `tickIntervalMs` period from `timer.json`.
    pub fn spawn_configured(state: Arc<AppState>) -> Result<Self, InfraError> {
        let period = timer_tick_interval(&state)?;
        Ok(Self::spawn(state, period))
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TimerTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
