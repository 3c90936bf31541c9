//! Next-allowed-sortie clock
//!
//! One timestamp, one setter. Every decline path goes through
//! [`SortieClock::defer`], so whichever path ran last decides the next attempt.

use chrono::{DateTime, Local, TimeDelta};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SortieClock {
    next_sortie: DateTime<Local>,
    last_delay: Option<Duration>,
}

impl Default for SortieClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SortieClock {
    /// A clock that allows a sortie immediately.
    pub fn new() -> Self {
        Self {
            next_sortie: Local::now(),
            last_delay: None,
        }
    }

    /// Push the next allowed sortie to `now + delay`.
    pub fn defer(&mut self, delay: Duration) {
        self.defer_from(Local::now(), delay);
    }

    pub fn defer_from(&mut self, now: DateTime<Local>, delay: Duration) {
        let delta = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        self.next_sortie = now.checked_add_signed(delta).unwrap_or(now);
        self.last_delay = Some(delay);
        debug!(next = %self.format_next(), delay_secs = delay.as_secs(), "Next sortie rescheduled");
    }

    /// Whether a sortie may start at `now`.
    pub fn is_due_at(&self, now: DateTime<Local>) -> bool {
        now >= self.next_sortie
    }

    pub fn is_due(&self) -> bool {
        self.is_due_at(Local::now())
    }

    pub fn next_sortie(&self) -> DateTime<Local> {
        self.next_sortie
    }

    /// Delay passed to the most recent `defer`, if any.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    pub fn format_next(&self) -> String {
        self.next_sortie.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
