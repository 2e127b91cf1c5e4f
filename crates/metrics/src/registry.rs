//! Metric registries
//!
//! A `Registry` hands out shared metric handles keyed by name and labels.
//! Components look their handles up once at construction and update them
//! with atomics on the hot path; the reporter reads everything back through
//! `snapshot()`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

use crate::{Counter, Timer};

/// Metric name plus sorted labels
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricKey {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl MetricKey {
    /// Build a key from a name and label pairs
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Check name and labels without allocating a key
    pub fn matches(&self, name: &str, labels: &[(&str, &str)]) -> bool {
        self.name == name
            && self.labels.len() == labels.len()
            && labels
                .iter()
                .all(|(k, v)| self.labels.get(*k).is_some_and(|have| have == v))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.labels.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (k, v)) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

/// Source of metric handles, injected into components at construction
pub trait Registry: Send + Sync + fmt::Debug {
    /// Get or create the counter for `name` and `labels`
    fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Counter>;

    /// Get or create the timer for `name` and `labels`
    fn timer(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Timer>;

    /// Point-in-time copy of every registered metric
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Registry that records nothing
///
/// Handles are real atomics so components behave identically, they are just
/// never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl Registry for NoopRegistry {
    fn counter(&self, _name: &str, _labels: &[(&str, &str)]) -> Arc<Counter> {
        Arc::new(Counter::new())
    }

    fn timer(&self, _name: &str, _labels: &[(&str, &str)]) -> Arc<Timer> {
        Arc::new(Timer::new())
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::default()
    }
}

/// Shared no-op registry
pub fn noop() -> Arc<dyn Registry> {
    Arc::new(NoopRegistry)
}

/// In-process registry backing the periodic reporter
#[derive(Debug, Default)]
pub struct LocalRegistry {
    counters: RwLock<BTreeMap<MetricKey, Arc<Counter>>>,
    timers: RwLock<BTreeMap<MetricKey, Arc<Timer>>>,
}

impl LocalRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for LocalRegistry {
    fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Counter> {
        let key = MetricKey::new(name, labels);
        if let Some(counter) = self.counters.read().get(&key) {
            return Arc::clone(counter);
        }
        Arc::clone(self.counters.write().entry(key).or_default())
    }

    fn timer(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Timer> {
        let key = MetricKey::new(name, labels);
        if let Some(timer) = self.timers.read().get(&key) {
            return Arc::clone(timer);
        }
        Arc::clone(self.timers.write().entry(key).or_default())
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .iter()
            .map(|(key, counter)| CounterSample {
                key: key.clone(),
                value: counter.get(),
            })
            .collect();

        let timers = self
            .timers
            .read()
            .iter()
            .map(|(key, timer)| TimerSample {
                key: key.clone(),
                count: timer.count(),
                total_ns: timer.total_ns(),
                max_ns: timer.max_ns(),
            })
            .collect();

        MetricsSnapshot {
            timestamp: Some(Instant::now()),
            counters,
            timers,
        }
    }
}

/// Counter value at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    pub key: MetricKey,
    pub value: u64,
}

/// Timer state at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSample {
    pub key: MetricKey,
    pub count: u64,
    pub total_ns: u64,
    pub max_ns: u64,
}

/// Every metric in a registry at one instant, sorted by key
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    #[serde(skip)]
    pub timestamp: Option<Instant>,
    pub counters: Vec<CounterSample>,
    pub timers: Vec<TimerSample>,
}

impl MetricsSnapshot {
    /// Look up a counter value
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters
            .iter()
            .find(|s| s.key.matches(name, labels))
            .map(|s| s.value)
    }

    /// Look up a timer sample
    pub fn timer(&self, name: &str, labels: &[(&str, &str)]) -> Option<&TimerSample> {
        self.timers.iter().find(|s| s.key.matches(name, labels))
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.timers.is_empty()
    }

    /// Rates between a previous snapshot and this one
    ///
    /// Returns `None` if either snapshot lacks a timestamp or no time passed.
    pub fn rates(&self, previous: &MetricsSnapshot) -> Option<MetricsRates> {
        let now = self.timestamp?;
        let then = previous.timestamp?;
        let elapsed_secs = now.checked_duration_since(then)?.as_secs_f64();
        if elapsed_secs <= 0.0 {
            return None;
        }

        let prev_counters: BTreeMap<&MetricKey, u64> = previous
            .counters
            .iter()
            .map(|s| (&s.key, s.value))
            .collect();
        let prev_timers: BTreeMap<&MetricKey, &TimerSample> =
            previous.timers.iter().map(|s| (&s.key, s)).collect();

        let counters = self
            .counters
            .iter()
            .map(|s| {
                let before = prev_counters.get(&s.key).copied().unwrap_or(0);
                let delta = s.value.saturating_sub(before);
                CounterRate {
                    key: s.key.clone(),
                    total: s.value,
                    per_sec: delta as f64 / elapsed_secs,
                }
            })
            .collect();

        let timers = self
            .timers
            .iter()
            .map(|s| {
                let (count_before, total_before) = prev_timers
                    .get(&s.key)
                    .map(|p| (p.count, p.total_ns))
                    .unwrap_or((0, 0));
                let count = s.count.saturating_sub(count_before);
                let total = s.total_ns.saturating_sub(total_before);
                TimerRate {
                    key: s.key.clone(),
                    count,
                    mean_ns: if count == 0 { 0 } else { total / count },
                    max_ns: s.max_ns,
                }
            })
            .collect();

        Some(MetricsRates {
            elapsed_secs,
            counters,
            timers,
        })
    }
}

/// Counter change over a reporting interval
#[derive(Debug, Clone, Serialize)]
pub struct CounterRate {
    pub key: MetricKey,
    pub total: u64,
    pub per_sec: f64,
}

/// Timer observations over a reporting interval
#[derive(Debug, Clone, Serialize)]
pub struct TimerRate {
    pub key: MetricKey,
    pub count: u64,
    pub mean_ns: u64,
    pub max_ns: u64,
}

/// Rates computed between two snapshots
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsRates {
    pub elapsed_secs: f64,
    pub counters: Vec<CounterRate>,
    pub timers: Vec<TimerRate>,
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
