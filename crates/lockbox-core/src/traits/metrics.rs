//! Counter metrics sink.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Receives counter increments keyed by name and optional label.
pub trait MetricsSink: Send + Sync + fmt::Debug + 'static {
    /// Increment the counter `name`, optionally scoped by `label`.
    fn incr(&self, name: &str, label: Option<&str>);
}

/// In-process counters, readable back for diagnostics and tests.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    counters: DashMap<(String, Option<String>), AtomicU64>,
}

impl CounterMetrics {
    /// Creates an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if never incremented.
    pub fn get(&self, name: &str, label: Option<&str>) -> u64 {
        self.counters
            .get(&(name.to_string(), label.map(str::to_string)))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl MetricsSink for CounterMetrics {
    fn incr(&self, name: &str, label: Option<&str>) {
        self.counters
            .entry((name.to_string(), label.map(str::to_string)))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }
}
