use serde::{Deserialize, Serialize};

const MINUTE_MILLIS: u64 = 60 * 1000;
pub const DEFAULT_MAX_SESSIONS: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimerMode {
    #[default]
    #[serde(rename = "pomodoro_25")]
    Pomodoro25,
    #[serde(rename = "pomodoro_50")]
    Pomodoro50,
    #[serde(rename = "custom")]
    Custom,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pomodoro25 => "pomodoro_25",
            Self::Pomodoro50 => "pomodoro_50",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pomodoro_25" => Ok(Self::Pomodoro25),
            "pomodoro_50" => Ok(Self::Pomodoro50),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unsupported timer mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerDurations {
    pub focus_millis: u64,
    pub short_break_millis: u64,
    pub long_break_millis: u64,
    pub max_sessions: u32,
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self::pomodoro_25()
    }
}

impl TimerDurations {
    /// Converts minute counts, rejecting values whose millisecond form overflows.
    pub fn from_minutes(
        focus: u64,
        short_break: u64,
        long_break: u64,
        max_sessions: u32,
    ) -> Result<Self, String> {
        Ok(Self {
            focus_millis: minutes_to_millis(focus, "timer.focus")?,
            short_break_millis: minutes_to_millis(short_break, "timer.short_break")?,
            long_break_millis: minutes_to_millis(long_break, "timer.long_break")?,
            max_sessions,
        })
    }

    const fn preset(focus: u64, short_break: u64, long_break: u64) -> Self {
        Self {
            focus_millis: focus * MINUTE_MILLIS,
            short_break_millis: short_break * MINUTE_MILLIS,
            long_break_millis: long_break * MINUTE_MILLIS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn pomodoro_25() -> Self {
        Self::preset(25, 5, 15)
    }

    pub fn pomodoro_50() -> Self {
        Self::preset(50, 10, 20)
    }

    pub fn custom_default() -> Self {
        Self::preset(30, 5, 10)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.focus_millis == 0 {
            return Err("timer.focus duration must be > 0".to_string());
        }
        if self.short_break_millis == 0 {
            return Err("timer.short_break duration must be > 0".to_string());
        }
        if self.long_break_millis == 0 {
            return Err("timer.long_break duration must be > 0".to_string());
        }
        if self.max_sessions == 0 {
            return Err("timer.max_sessions must be > 0".to_string());
        }
        Ok(())
    }

    pub fn duration_for(&self, session_type: SessionType) -> u64 {
        match session_type {
            SessionType::Focus => self.focus_millis,
            SessionType::ShortBreak => self.short_break_millis,
            SessionType::LongBreak => self.long_break_millis,
        }
    }
}

fn minutes_to_millis(minutes: u64, field: &str) -> Result<u64, String> {
    minutes
        .checked_mul(MINUTE_MILLIS)
        .ok_or_else(|| format!("{field} duration of {minutes} minutes is too large"))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SessionTransition {
    pub from: SessionType,
    pub to: SessionType,
    pub completed_focus_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionIndicator {
    Completed,
    Current,
    Upcoming,
}

/// Countdown cycling focus and break sessions.
///
/// The timer never schedules itself: the owner feeds elapsed time through
/// [`SessionTimer::tick`]. A finished session stops the countdown and the
/// next one waits for [`SessionTimer::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    durations: TimerDurations,
    session_type: SessionType,
    remaining_millis: u64,
    total_millis: u64,
    completed_focus_count: u32,
    running: bool,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(TimerDurations::default())
    }
}

impl SessionTimer {
    pub fn new(durations: TimerDurations) -> Self {
        let total_millis = durations.focus_millis;
        Self {
            durations,
            session_type: SessionType::Focus,
            remaining_millis: total_millis,
            total_millis,
            completed_focus_count: 0,
            running: false,
        }
    }

    pub fn durations(&self) -> TimerDurations {
        self.durations
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn remaining_millis(&self) -> u64 {
        self.remaining_millis
    }

    pub fn total_millis(&self) -> u64 {
        self.total_millis
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.remaining_millis == 0 {
            self.restore_full_duration();
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.restore_full_duration();
    }

    pub fn skip(&mut self) -> SessionTransition {
        self.running = false;
        self.complete_session()
    }

    pub fn tick(&mut self, elapsed_millis: u64) -> Option<SessionTransition> {
        if !self.running {
            return None;
        }
        self.remaining_millis = self.remaining_millis.saturating_sub(elapsed_millis);
        if self.remaining_millis > 0 {
            return None;
        }
        self.running = false;
        Some(self.complete_session())
    }

    /// Swaps in new durations and restarts the current session from full.
    pub fn set_durations(&mut self, durations: TimerDurations) {
        self.durations = durations;
        let last_slot = durations.max_sessions.saturating_sub(1);
        self.completed_focus_count = self.completed_focus_count.min(last_slot);
        self.reset();
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.total_millis == 0 {
            return 0.0;
        }
        (self.total_millis - self.remaining_millis) as f64 / self.total_millis as f64
    }

    pub fn remaining_label(&self) -> String {
        let total_seconds = self.remaining_millis / 1000;
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    pub fn next_session_type(&self) -> SessionType {
        match self.session_type {
            SessionType::Focus if self.completed_focus_count + 1 >= self.durations.max_sessions => {
                SessionType::LongBreak
            }
            SessionType::Focus => SessionType::ShortBreak,
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Focus,
        }
    }

    pub fn indicators(&self) -> Vec<SessionIndicator> {
        (0..self.durations.max_sessions)
            .map(|slot| {
                if slot < self.completed_focus_count {
                    SessionIndicator::Completed
                } else if slot == self.completed_focus_count {
                    SessionIndicator::Current
                } else {
                    SessionIndicator::Upcoming
                }
            })
            .collect()
    }

    fn complete_session(&mut self) -> SessionTransition {
        let from = self.session_type;
        let to = match from {
            SessionType::Focus => {
                self.completed_focus_count += 1;
                if self.completed_focus_count >= self.durations.max_sessions {
                    self.completed_focus_count = 0;
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Focus,
        };
        self.session_type = to;
        self.reset();
        SessionTransition {
            from,
            to,
            completed_focus_count: self.completed_focus_count,
        }
    }

    fn restore_full_duration(&mut self) {
        self.total_millis = self.durations.duration_for(self.session_type);
        self.remaining_millis = self.total_millis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FOCUS_MILLIS: u64 = 1_500_000;

    fn running_timer() -> SessionTimer {
        let mut timer = SessionTimer::new(TimerDurations::pomodoro_25());
        timer.start();
        timer
    }

    fn finish_with_ticks(timer: &mut SessionTimer, tick_millis: u64) -> Option<SessionTransition> {
        timer.start();
        let mut transition = None;
        while transition.is_none() {
            transition = timer.tick(tick_millis);
        }
        transition
    }

    #[test]
    fn new_timer_is_idle_focus_at_full_duration() {
        let timer = SessionTimer::default();
        assert_eq!(timer.session_type(), SessionType::Focus);
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS);
        assert_eq!(timer.total_millis(), FOCUS_MILLIS);
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_label(), "25:00");
        assert_eq!(timer.progress_fraction(), 0.0);
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let mut timer = SessionTimer::default();
        assert_eq!(timer.tick(10_000), None);
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS);

        timer.start();
        timer.tick(60_000);
        timer.pause();
        timer.tick(60_000);
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS - 60_000);
        assert_eq!(timer.remaining_label(), "24:00");
    }

    #[test]
    fn start_is_noop_when_running_and_keeps_progress_after_pause() {
        let mut timer = running_timer();
        timer.tick(1_000);
        timer.start();
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS - 1_000);

        timer.pause();
        timer.start();
        assert!(timer.is_running());
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS - 1_000);
    }

    #[test]
    fn reset_discards_progress() {
        let mut timer = running_timer();
        timer.tick(300_000);
        assert!((timer.progress_fraction() - 0.2).abs() < f64::EPSILON);

        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_millis(), FOCUS_MILLIS);
        assert_eq!(timer.session_type(), SessionType::Focus);
    }

    #[test]
    fn exhausting_focus_moves_to_short_break_and_stops() {
        let mut timer = running_timer();
        assert_eq!(timer.tick(1_499_000), None);
        let transition = timer.tick(1_000).expect("session completes");

        assert_eq!(
            transition,
            SessionTransition {
                from: SessionType::Focus,
                to: SessionType::ShortBreak,
                completed_focus_count: 1,
            }
        );
        assert_eq!(timer.session_type(), SessionType::ShortBreak);
        assert_eq!(timer.remaining_millis(), 5 * 60 * 1000);
        assert_eq!(timer.total_millis(), 5 * 60 * 1000);
        assert!(!timer.is_running());
        assert_eq!(timer.tick(1_000), None);
    }

    #[test]
    fn overshooting_tick_clamps_to_zero_before_transition() {
        let mut timer = running_timer();
        let transition = timer.tick(FOCUS_MILLIS * 3).expect("session completes");
        assert_eq!(transition.to, SessionType::ShortBreak);
        assert_eq!(timer.remaining_millis(), timer.total_millis());
    }

    #[test]
    fn fourth_focus_session_earns_long_break() {
        let mut timer = SessionTimer::default();
        for expected_count in 1..=3 {
            let transition = finish_with_ticks(&mut timer, 60_000).expect("focus done");
            assert_eq!(transition.to, SessionType::ShortBreak);
            assert_eq!(transition.completed_focus_count, expected_count);
            let transition = finish_with_ticks(&mut timer, 60_000).expect("break done");
            assert_eq!(transition.to, SessionType::Focus);
            assert_eq!(timer.completed_focus_count(), expected_count);
        }

        assert_eq!(timer.next_session_type(), SessionType::LongBreak);
        let transition = finish_with_ticks(&mut timer, 60_000).expect("fourth focus done");
        assert_eq!(transition.to, SessionType::LongBreak);
        assert_eq!(timer.completed_focus_count(), 0);
        assert_eq!(timer.remaining_millis(), 15 * 60 * 1000);

        let transition = timer.skip();
        assert_eq!(transition.to, SessionType::Focus);
        assert_eq!(timer.completed_focus_count(), 0);
    }

    #[test]
    fn next_session_preview() {
        let mut timer = SessionTimer::default();
        assert_eq!(timer.next_session_type(), SessionType::ShortBreak);
        timer.skip();
        assert_eq!(timer.next_session_type(), SessionType::Focus);
    }

    #[test]
    fn indicators_follow_completed_count() {
        let mut timer = SessionTimer::default();
        timer.skip();
        timer.skip();
        timer.skip();
        assert_eq!(timer.completed_focus_count(), 2);
        assert_eq!(
            timer.indicators(),
            vec![
                SessionIndicator::Completed,
                SessionIndicator::Completed,
                SessionIndicator::Current,
                SessionIndicator::Upcoming,
            ]
        );
    }

    #[test]
    fn changing_durations_resets_current_session() {
        let mut timer = running_timer();
        timer.tick(100_000);
        timer.skip();
        timer.set_durations(TimerDurations::pomodoro_50());
        assert_eq!(timer.session_type(), SessionType::ShortBreak);
        assert_eq!(timer.remaining_millis(), 10 * 60 * 1000);
        assert_eq!(timer.completed_focus_count(), 1);
        assert!(!timer.is_running());
    }

    #[test]
    fn start_refills_an_exhausted_session() {
        let mut timer = SessionTimer::new(TimerDurations::custom_default());
        timer.remaining_millis = 0;
        timer.start();
        assert_eq!(timer.remaining_millis(), 30 * 60 * 1000);
        assert!(timer.is_running());
    }

    #[test]
    fn zero_total_reports_zero_progress() {
        let mut timer = SessionTimer::default();
        timer.total_millis = 0;
        timer.remaining_millis = 0;
        assert_eq!(timer.progress_fraction(), 0.0);
    }

    #[test]
    fn durations_validation_and_mode_parsing() {
        assert!(TimerDurations::pomodoro_25().validate().is_ok());
        assert!(TimerDurations::from_minutes(0, 5, 15, 4).expect("minutes").validate().is_err());
        assert!(TimerDurations::from_minutes(25, 5, 15, 0).expect("minutes").validate().is_err());
        assert_eq!(
            TimerDurations::from_minutes(25, 5, 15, 4).expect("minutes"),
            TimerDurations::pomodoro_25()
        );
        assert!(TimerDurations::from_minutes(u64::MAX, 5, 15, 4).is_err());
        assert!(TimerDurations::from_minutes(25, 5, u64::MAX / 1000, 4).is_err());
        assert_eq!(TimerMode::parse("POMODORO_50"), Ok(TimerMode::Pomodoro50));
        assert!(TimerMode::parse("pomodoro_90").is_err());
    }

    // Feature: studentcal, Property 5: coalesced ticks reach the same state as fine ticks
    proptest! {
        #[test]
        fn property5_tick_coalescing_is_equivalent(
            steps in prop::collection::vec(1u64..120_000u64, 1..40)
        ) {
            let mut coarse = running_timer();
            let mut fine = running_timer();

            let total: u64 = steps.iter().sum();
            coarse.tick(total);
            for step in &steps {
                fine.tick(*step);
            }
            prop_assert_eq!(coarse, fine);
        }
    }

    // Feature: studentcal, Property 6: skip equals letting the session run out
    proptest! {
        #[test]
        fn property6_skip_matches_natural_completion(
            completed_before in 0usize..8usize,
            elapsed in 0u64..FOCUS_MILLIS
        ) {
            let mut base = SessionTimer::default();
            for _ in 0..completed_before {
                base.skip();
            }
            base.start();
            base.tick(elapsed % base.total_millis());

            let mut skipped = base.clone();
            let mut exhausted = base.clone();
            let skip_transition = skipped.skip();
            let remaining = exhausted.remaining_millis();
            let natural_transition = exhausted.tick(remaining);

            prop_assert_eq!(Some(skip_transition), natural_transition);
            prop_assert_eq!(skipped, exhausted);
        }
    }

    #[test]
    fn skip_at_500_seconds_left_matches_exhaustion() {
        let mut skipped = running_timer();
        skipped.tick(FOCUS_MILLIS - 500_000);
        let mut exhausted = skipped.clone();

        skipped.skip();
        exhausted.tick(500_000);
        assert_eq!(skipped, exhausted);
    }
}
