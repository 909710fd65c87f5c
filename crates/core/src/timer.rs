use chrono::{DateTime, Duration, Utc};

use crate::time::Clock;

/// Countdown for a single question.
///
/// The timer does not tick on its own; callers ask it how much time is left
/// against a [`Clock`]. Cancelling freezes it: a cancelled timer has no time
/// left and never reports expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTimer {
    started_at: DateTime<Utc>,
    limit_secs: u32,
    cancelled: bool,
}

impl QuestionTimer {
    #[must_use]
    pub fn start(clock: &Clock, limit_secs: u32) -> Self {
        Self {
            started_at: clock.now(),
            limit_secs,
            cancelled: false,
        }
    }

    #[must_use]
    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds elapsed since start, never negative.
    #[must_use]
    pub fn elapsed_secs(&self, clock: &Clock) -> u32 {
        let elapsed = clock.now() - self.started_at;
        u32::try_from(elapsed.num_seconds().max(0)).unwrap_or(u32::MAX)
    }

    /// Whole seconds left, counting down once per elapsed second.
    #[must_use]
    pub fn remaining_secs(&self, clock: &Clock) -> u32 {
        if self.cancelled {
            return 0;
        }
        self.limit_secs.saturating_sub(self.elapsed_secs(clock))
    }

    #[must_use]
    pub fn is_expired(&self, clock: &Clock) -> bool {
        !self.cancelled && self.remaining_secs(clock) == 0
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Start over from now with the same limit.
    pub fn restart(&mut self, clock: &Clock) {
        self.started_at = clock.now();
        self.cancelled = false;
    }

    /// Instant at which the timer runs out.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::seconds(i64::from(self.limit_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_clock;

    #[test]
    fn counts_down_whole_seconds() {
        let mut clock = fixed_clock();
        let timer = QuestionTimer::start(&clock, 30);
        assert_eq!(timer.remaining_secs(&clock), 30);

        clock.advance(Duration::milliseconds(1_500));
        assert_eq!(timer.remaining_secs(&clock), 29);

        clock.advance_secs(28);
        assert_eq!(timer.remaining_secs(&clock), 1);
        assert!(!timer.is_expired(&clock));

        clock.advance_secs(5);
        assert_eq!(timer.remaining_secs(&clock), 0);
        assert!(timer.is_expired(&clock));
        assert_eq!(timer.deadline(), timer.started_at() + Duration::seconds(30));
    }

    #[test]
    fn cancelled_timer_never_expires() {
        let mut clock = fixed_clock();
        let mut timer = QuestionTimer::start(&clock, 10);
        timer.cancel();
        clock.advance_secs(60);
        assert!(timer.is_cancelled());
        assert!(!timer.is_expired(&clock));
        assert_eq!(timer.remaining_secs(&clock), 0);
    }

    #[test]
    fn restart_resets_start_and_cancellation() {
        let mut clock = fixed_clock();
        let mut timer = QuestionTimer::start(&clock, 20);
        clock.advance_secs(15);
        timer.cancel();
        timer.restart(&clock);
        assert!(!timer.is_cancelled());
        assert_eq!(timer.remaining_secs(&clock), 20);
    }

    #[test]
    fn clock_going_backwards_does_not_add_time() {
        let clock = fixed_clock();
        let timer = QuestionTimer::start(&clock, 20);
        let earlier = Clock::fixed(clock.now() - Duration::seconds(10));
        assert_eq!(timer.remaining_secs(&earlier), 20);
    }
}
