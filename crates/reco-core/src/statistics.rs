//! Per-request counters and timers.
//!
//! A `Statistics` lives exactly as long as its `Context`. Engines running
//! in parallel record into the same instance, so all state sits behind a
//! `parking_lot::Mutex`. Time since creation is measured with a monotonic
//! `Instant` and exposed under [`TOTAL_TIME`].

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Statistics key for the time elapsed since the request started.
pub const TOTAL_TIME: &str = "TOTAL_TIME";

/// Value key for the number of candidates a task produced.
pub const CANDIDATE_COUNT: &str = "candidates";

/// Value key for the number of failures attributed to a task.
pub const FAILURE_COUNT: &str = "failures";

#[derive(Debug, Default)]
struct Recorded {
    timers: HashMap<String, Duration>,
    running: HashMap<String, Instant>,
    values: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Mutable, thread-safe statistics for one request.
#[derive(Debug)]
pub struct Statistics {
    input: String,
    created: Instant,
    recorded: Mutex<Recorded>,
}

impl Statistics {
    /// Start collecting statistics for the described input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            created: Instant::now(),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Description of the input these statistics belong to.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Start (or restart) the timer of a task.
    pub fn start_timing(&self, task: &str) {
        self.recorded
            .lock()
            .running
            .insert(task.to_string(), Instant::now());
    }

    /// Stop the timer of a task and add the elapsed time to its total.
    ///
    /// Returns the elapsed time, or zero if the timer was never started.
    pub fn stop_timing(&self, task: &str) -> Duration {
        let mut recorded = self.recorded.lock();
        let Some(started) = recorded.running.remove(task) else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        *recorded.timers.entry(task.to_string()).or_default() += elapsed;
        elapsed
    }

    /// Add an externally measured duration to a task's total.
    pub fn add_time(&self, task: &str, elapsed: Duration) {
        *self
            .recorded
            .lock()
            .timers
            .entry(task.to_string())
            .or_default() += elapsed;
    }

    /// Accumulated time of a task. `TOTAL_TIME` is time since creation.
    pub fn get_time(&self, task: &str) -> Duration {
        if task == TOTAL_TIME {
            return self.created.elapsed();
        }
        self.recorded
            .lock()
            .timers
            .get(task)
            .copied()
            .unwrap_or_default()
    }

    /// Add to a named value of a task.
    pub fn add_value(&self, task: &str, key: &str, value: i64) {
        *self
            .recorded
            .lock()
            .values
            .entry(task.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(0) += value;
    }

    pub fn increment_counter(&self, task: &str, key: &str) {
        self.add_value(task, key, 1);
    }

    pub fn get_value(&self, task: &str, key: &str) -> Option<i64> {
        self.recorded
            .lock()
            .values
            .get(task)
            .and_then(|values| values.get(key))
            .copied()
    }

    /// Copy everything recorded so far.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let recorded = self.recorded.lock();
        StatisticsSnapshot {
            input: self.input.clone(),
            total_time_ms: self.created.elapsed().as_secs_f64() * 1000.0,
            timers_ms: recorded
                .timers
                .iter()
                .map(|(task, elapsed)| (task.clone(), elapsed.as_secs_f64() * 1000.0))
                .collect(),
            values: recorded.values.clone(),
        }
    }
}

/// Point-in-time copy of a request's statistics, ready for output.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSnapshot {
    pub input: String,
    pub total_time_ms: f64,
    pub timers_ms: BTreeMap<String, f64>,
    pub values: BTreeMap<String, BTreeMap<String, i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_total_time_is_monotonic() {
        let statistics = Statistics::new("user-1");
        let first = statistics.get_time(TOTAL_TIME);
        thread::sleep(Duration::from_millis(2));
        let second = statistics.get_time(TOTAL_TIME);
        assert!(second > first);
    }

    #[test]
    fn test_timers_accumulate() {
        let statistics = Statistics::new("user-1");
        statistics.add_time("friends", Duration::from_millis(5));
        statistics.add_time("friends", Duration::from_millis(7));

        assert_eq!(statistics.get_time("friends"), Duration::from_millis(12));
        assert_eq!(statistics.get_time("unknown"), Duration::ZERO);
        assert_eq!(statistics.stop_timing("never-started"), Duration::ZERO);

        statistics.start_timing("likes");
        let elapsed = statistics.stop_timing("likes");
        assert_eq!(statistics.get_time("likes"), elapsed);
    }

    #[test]
    fn test_concurrent_counters() {
        let statistics = Arc::new(Statistics::new("user-1"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let statistics = Arc::clone(&statistics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        statistics.increment_counter("engine", CANDIDATE_COUNT);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(statistics.get_value("engine", CANDIDATE_COUNT), Some(800));
        assert_eq!(statistics.get_value("engine", FAILURE_COUNT), None);
    }

    #[test]
    fn test_snapshot_copies_values() {
        let statistics = Statistics::new("user-1");
        statistics.add_value("engine", CANDIDATE_COUNT, 7);
        statistics.add_time("engine", Duration::from_millis(3));

        let snapshot = statistics.snapshot();
        assert_eq!(snapshot.input, "user-1");
        assert_eq!(snapshot.values["engine"][CANDIDATE_COUNT], 7);
        assert!((snapshot.timers_ms["engine"] - 3.0).abs() < 1e-6);
    }
}
