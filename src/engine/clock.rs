//! The audio clock and the cancellable periodic task that drives the
//! lookahead tick.
//!
//! Time only moves when frames are rendered, so everything scheduled
//! against [`AudioClock::now`] is sample-accurate by construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Frame counter for one engine instance.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frame: u64,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f64) -> Self {
        AudioClock {
            frame: 0,
            sample_rate,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds since the clock started.
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn advance(&mut self, frames: usize) {
        self.frame += frames as u64;
    }

    /// First frame at or after `secs`.
    pub fn frame_at(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate).ceil() as u64
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A fixed-period task polled against the audio clock.
///
/// A poll fires at most once however late it is; missed periods are
/// coalesced into that single firing. Once the token is cancelled no poll
/// ever fires again.
#[derive(Debug)]
pub struct PeriodicTask {
    period: f64,
    next_due: f64,
    token: CancelToken,
}

impl PeriodicTask {
    /// A task whose first firing is due at `first_due`.
    pub fn new(period: f64, first_due: f64, token: CancelToken) -> Self {
        PeriodicTask {
            period,
            next_due: first_due,
            token,
        }
    }

    /// True when the task should run at `now`.
    pub fn due(&mut self, now: f64) -> bool {
        if self.token.is_cancelled() || now < self.next_due {
            return false;
        }
        let missed = ((now - self.next_due) / self.period).floor();
        self.next_due += (missed + 1.0) * self.period;
        true
    }

    pub fn next_due(&self) -> f64 {
        self.next_due
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_counts_seconds() {
        let mut clock = AudioClock::new(48000.0);
        clock.advance(24000);
        assert_eq!(clock.frame(), 24000);
        assert!((clock.now() - 0.5).abs() < 1e-12);
        assert_eq!(clock.frame_at(1.0), 48000);
    }

    #[test]
    fn fires_once_per_period() {
        let mut task = PeriodicTask::new(0.025, 0.0, CancelToken::new());
        assert!(task.due(0.0));
        assert!(!task.due(0.01));
        assert!(task.due(0.025));
        assert!(!task.due(0.03));
        assert!((task.next_due() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn late_poll_coalesces_missed_periods() {
        let mut task = PeriodicTask::new(0.025, 0.0, CancelToken::new());
        assert!(task.due(0.0));
        // Four periods late: one firing, then realigned to the grid.
        assert!(task.due(0.11));
        assert!(!task.due(0.11));
        assert!((task.next_due() - 0.125).abs() < 1e-9);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let token = CancelToken::new();
        let mut task = PeriodicTask::new(0.025, 0.0, token.clone());
        token.cancel();
        assert!(task.is_cancelled());
        for i in 0..10 {
            assert!(!task.due(i as f64));
        }
    }

    #[test]
    fn fresh_token_is_independent() {
        let old = CancelToken::new();
        old.cancel();
        let fresh = CancelToken::new();
        assert!(!fresh.is_cancelled());
    }
}
