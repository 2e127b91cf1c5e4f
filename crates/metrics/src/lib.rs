//! Conduit - Metrics
//!
//! Internal metrics collection and reporting for observability.
//!
//! # Overview
//!
//! This crate provides:
//! - Atomic `Counter` and `Timer` primitives
//! - A `Registry` trait that components receive at construction
//! - `NoopRegistry` for tests and `LocalRegistry` for in-process collection
//! - A reporter task that logs registry snapshots (human or JSON)
//!
//! # Design Principles
//!
//! - **Lock-free updates**: metric handles are `Arc<Counter>` / `Arc<Timer>`
//!   looked up once at construction, then updated with relaxed atomics
//! - **Constructor injection**: components take `Arc<dyn Registry>`, never a
//!   global, so they stay testable in isolation
//! - **Labelled names**: `registry.counter("output_sent", &[("endpoint", "get")])`
//!
//! # Example
//!
//! ```ignore
//! use conduit_metrics::{LocalRegistry, Registry};
//! use std::sync::Arc;
//!
//! let registry: Arc<dyn Registry> = Arc::new(LocalRegistry::new());
//! let sent = registry.counter("output_sent", &[("endpoint", "get")]);
//! sent.inc();
//!
//! tokio::spawn(MetricsReporter::new(registry, &config).run(cancel));
//! ```

pub mod format;
mod registry;
mod reporter;

pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use registry::{
    CounterRate, CounterSample, LocalRegistry, MetricKey, MetricsRates, MetricsSnapshot,
    NoopRegistry, Registry, TimerRate, TimerSample, noop,
};
pub use reporter::MetricsReporter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset the counter to 0 and return the previous value
    #[inline]
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Latency accumulator: observation count, total and max in nanoseconds
#[derive(Debug, Default)]
pub struct Timer {
    count: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl Timer {
    /// Create a new timer with no observations
    #[inline]
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
        }
    }

    /// Record one observation
    #[inline]
    pub fn record(&self, elapsed: Duration) {
        self.record_ns(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
    }

    /// Record one observation in nanoseconds
    #[inline]
    pub fn record_ns(&self, ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    /// Record the time elapsed since `start`
    #[inline]
    pub fn record_since(&self, start: Instant) {
        self.record(start.elapsed());
    }

    /// Number of observations
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all observations in nanoseconds
    #[inline]
    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed)
    }

    /// Largest observation in nanoseconds
    #[inline]
    pub fn max_ns(&self) -> u64 {
        self.max_ns.load(Ordering::Relaxed)
    }

    /// Mean observation in nanoseconds, 0 when empty
    pub fn mean_ns(&self) -> u64 {
        let count = self.count();
        if count == 0 { 0 } else { self.total_ns() / count }
    }
}
