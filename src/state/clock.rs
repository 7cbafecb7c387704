use std::time::{Duration, SystemTime};

use thiserror::Error;

/// Error returned when a pause/resume call does not alternate correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// `pause` was called while the clock was already paused.
    #[error("session clock is already paused")]
    AlreadyPaused,
    /// `resume` was called while the clock was already running.
    #[error("session clock is already running")]
    AlreadyRunning,
}

/// Wall-clock bookkeeping for a live session.
///
/// Elapsed time is never stored as ground truth: it is recomputed on demand
/// from the start of the current active interval plus the durations folded in
/// at each pause. No background timer advances anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    start_time: SystemTime,
    /// Sum of all completed active intervals.
    accumulated: Duration,
    /// Start of the active interval currently running (meaningless while paused).
    interval_start: SystemTime,
    is_active: bool,
    last_paused_at: Option<SystemTime>,
}

impl SessionClock {
    /// Create a running clock anchored at `start`.
    pub fn started_at(start: SystemTime) -> Self {
        Self {
            start_time: start,
            accumulated: Duration::ZERO,
            interval_start: start,
            is_active: true,
            last_paused_at: None,
        }
    }

    /// Rebuild a clock from persisted fields.
    pub fn restore(
        start_time: SystemTime,
        accumulated: Duration,
        interval_start: SystemTime,
        is_active: bool,
        last_paused_at: Option<SystemTime>,
    ) -> Self {
        Self {
            start_time,
            accumulated,
            interval_start,
            is_active,
            last_paused_at,
        }
    }

    /// Wall-clock timestamp the session is considered to have started at.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Whether the clock is currently running.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Timestamp of the most recent pause, if any.
    pub fn last_paused_at(&self) -> Option<SystemTime> {
        self.last_paused_at
    }

    /// Sum of completed active intervals (excludes the interval in flight).
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Start of the active interval currently running.
    pub fn interval_start(&self) -> SystemTime {
        self.interval_start
    }

    /// Total active time as of `now`.
    ///
    /// Differences saturate to zero, so a wall clock stepping backwards can
    /// never produce a negative or panicking result.
    pub fn elapsed(&self, now: SystemTime) -> Duration {
        let running = if self.is_active {
            now.duration_since(self.interval_start).unwrap_or_default()
        } else {
            Duration::ZERO
        };
        self.accumulated + running
    }

    /// Stop the clock at `at`, folding the running interval into the total.
    pub fn pause(&mut self, at: SystemTime) -> Result<(), ClockError> {
        if !self.is_active {
            return Err(ClockError::AlreadyPaused);
        }
        self.accumulated += at.duration_since(self.interval_start).unwrap_or_default();
        self.is_active = false;
        self.last_paused_at = Some(at);
        Ok(())
    }

    /// Restart the clock at `at`, opening a fresh active interval.
    pub fn resume(&mut self, at: SystemTime) -> Result<(), ClockError> {
        if self.is_active {
            return Err(ClockError::AlreadyRunning);
        }
        self.is_active = true;
        self.interval_start = at;
        Ok(())
    }

    /// Retroactively move the session start to `new_start`.
    ///
    /// Destructive override: the accumulated pause/resume history is
    /// discarded and elapsed time is recomputed as one straight-line interval
    /// from `new_start` to `now` (or to the last pause when the clock is
    /// stopped). Multi-pause accuracy is intentionally lost; downstream
    /// consumers rely on this simpler recomputation.
    pub fn edit_start_time(&mut self, new_start: SystemTime, now: SystemTime) {
        let reference = if self.is_active {
            now
        } else {
            self.last_paused_at.unwrap_or(now)
        };
        self.accumulated = reference.duration_since(new_start).unwrap_or_default();
        self.start_time = new_start;
        self.interval_start = reference;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn elapsed_counts_only_active_intervals() {
        let mut clock = SessionClock::started_at(at(100));

        assert_eq!(clock.elapsed(at(160)), Duration::from_secs(60));

        clock.pause(at(160)).unwrap();
        assert_eq!(clock.elapsed(at(400)), Duration::from_secs(60));

        clock.resume(at(400)).unwrap();
        assert_eq!(clock.elapsed(at(430)), Duration::from_secs(90));

        clock.pause(at(430)).unwrap();
        clock.resume(at(500)).unwrap();
        clock.pause(at(510)).unwrap();
        // 60 + 30 + 10, regardless of how the breaks were interleaved.
        assert_eq!(clock.elapsed(at(9999)), Duration::from_secs(100));
    }

    #[test]
    fn pause_twice_is_rejected_and_changes_nothing() {
        let mut clock = SessionClock::started_at(at(0));
        clock.pause(at(10)).unwrap();

        let before = clock.clone();
        assert_eq!(clock.pause(at(20)), Err(ClockError::AlreadyPaused));
        assert_eq!(clock, before);
    }

    #[test]
    fn resume_while_running_is_rejected() {
        let mut clock = SessionClock::started_at(at(0));
        assert_eq!(clock.resume(at(5)), Err(ClockError::AlreadyRunning));
        assert_eq!(clock.elapsed(at(10)), Duration::from_secs(10));
    }

    #[test]
    fn edit_start_time_recomputes_straight_line_while_active() {
        let mut clock = SessionClock::started_at(at(1000));
        clock.pause(at(1100)).unwrap();
        clock.resume(at(1200)).unwrap();

        // History had a 100s break; the edit flattens it away.
        clock.edit_start_time(at(900), at(1300));
        assert_eq!(clock.elapsed(at(1300)), Duration::from_secs(400));
        assert_eq!(clock.start_time(), at(900));
        assert!(clock.is_active());
    }

    #[test]
    fn edit_start_time_uses_last_pause_while_paused() {
        let mut clock = SessionClock::started_at(at(1000));
        clock.pause(at(1250)).unwrap();

        clock.edit_start_time(at(1100), at(2000));
        // Straight line from the new start to the last pause, not to `now`.
        assert_eq!(clock.elapsed(at(2000)), Duration::from_secs(150));
        assert!(!clock.is_active());
    }

    #[test]
    fn edit_start_time_in_the_future_saturates_to_zero() {
        let mut clock = SessionClock::started_at(at(100));
        clock.edit_start_time(at(500), at(200));
        assert_eq!(clock.elapsed(at(200)), Duration::ZERO);
    }
}
