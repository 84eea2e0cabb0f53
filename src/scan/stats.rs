//! Session statistics
//!
//! Tracks attempt outcomes using a mutex-protected rolling window. Atomics
//! alone cannot compute accurate averages across samples.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MAX_SAMPLES: usize = 100;

#[derive(Debug, Clone)]
pub struct SessionStats {
    inner: Arc<Mutex<StatsInner>>,
}

#[derive(Debug)]
struct StatsInner {
    total_attempts: u64,
    active_attempts: u64,
    successful_attempts: u64,
    failed_attempts: u64,
    cancelled_attempts: u64,
    duration_samples: VecDeque<u64>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatsInner {
                total_attempts: 0,
                active_attempts: 0,
                successful_attempts: 0,
                failed_attempts: 0,
                cancelled_attempts: 0,
                duration_samples: VecDeque::with_capacity(MAX_SAMPLES),
            })),
        }
    }

    pub fn attempt_started(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_attempts += 1;
        inner.active_attempts += 1;
    }

    pub fn attempt_succeeded(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.active_attempts = inner.active_attempts.saturating_sub(1);
        inner.successful_attempts += 1;
        Self::record_duration(&mut inner, duration);
    }

    pub fn attempt_failed(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.active_attempts = inner.active_attempts.saturating_sub(1);
        inner.failed_attempts += 1;
        Self::record_duration(&mut inner, duration);
    }

    pub fn attempt_cancelled(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.active_attempts = inner.active_attempts.saturating_sub(1);
        inner.cancelled_attempts += 1;
    }

    fn record_duration(inner: &mut StatsInner, duration: Duration) {
        let duration_ms = duration.as_millis() as u64;
        if inner.duration_samples.len() >= MAX_SAMPLES {
            inner.duration_samples.pop_front();
        }
        inner.duration_samples.push_back(duration_ms);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap();
        let avg_duration_ms = if inner.duration_samples.is_empty() {
            0
        } else {
            inner.duration_samples.iter().sum::<u64>() / inner.duration_samples.len() as u64
        };

        StatsSnapshot {
            total_attempts: inner.total_attempts,
            active_attempts: inner.active_attempts,
            successful_attempts: inner.successful_attempts,
            failed_attempts: inner.failed_attempts,
            cancelled_attempts: inner.cancelled_attempts,
            average_duration_ms: avg_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_attempts: u64,
    pub active_attempts: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
    pub cancelled_attempts: u64,
    pub average_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accounting() {
        let stats = SessionStats::new();

        stats.attempt_started();
        stats.attempt_succeeded(Duration::from_millis(1000));
        stats.attempt_started();
        stats.attempt_failed(Duration::from_millis(3000));
        stats.attempt_started();
        stats.attempt_cancelled();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_attempts, 3);
        assert_eq!(snapshot.active_attempts, 0);
        assert_eq!(snapshot.successful_attempts, 1);
        assert_eq!(snapshot.failed_attempts, 1);
        assert_eq!(snapshot.cancelled_attempts, 1);
        assert_eq!(snapshot.average_duration_ms, 2000);
    }

    #[test]
    fn test_rolling_window_drops_oldest_sample() {
        let stats = SessionStats::new();

        stats.attempt_started();
        stats.attempt_succeeded(Duration::from_millis(10_000));
        for _ in 0..MAX_SAMPLES {
            stats.attempt_started();
            stats.attempt_succeeded(Duration::from_millis(100));
        }

        assert_eq!(stats.snapshot().average_duration_ms, 100);
    }
}
