//! Registry tests

use std::time::Duration;

use super::*;

// =============================================================================
// MetricKey
// =============================================================================

#[test]
fn test_metric_key_display() {
    let key = MetricKey::new("output_sent", &[("endpoint", "get")]);
    assert_eq!(key.to_string(), "output_sent{endpoint=get}");

    let key = MetricKey::new("broker_forwarded", &[]);
    assert_eq!(key.to_string(), "broker_forwarded");
}

#[test]
fn test_metric_key_labels_sorted() {
    let a = MetricKey::new("m", &[("b", "2"), ("a", "1")]);
    let b = MetricKey::new("m", &[("a", "1"), ("b", "2")]);
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "m{a=1,b=2}");
}

#[test]
fn test_metric_key_matches() {
    let key = MetricKey::new("m", &[("pattern", "round_robin")]);
    assert!(key.matches("m", &[("pattern", "round_robin")]));
    assert!(!key.matches("m", &[("pattern", "fan_out")]));
    assert!(!key.matches("m", &[]));
    assert!(!key.matches("other", &[("pattern", "round_robin")]));
}

// =============================================================================
// LocalRegistry
// =============================================================================

#[test]
fn test_local_registry_shares_handles() {
    let registry = LocalRegistry::new();

    let first = registry.counter("output_sent", &[("endpoint", "get")]);
    let second = registry.counter("output_sent", &[("endpoint", "get")]);
    first.inc();
    second.add(2);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(
        registry
            .snapshot()
            .counter("output_sent", &[("endpoint", "get")]),
        Some(3)
    );
}

#[test]
fn test_local_registry_distinct_labels() {
    let registry = LocalRegistry::new();
    registry.counter("output_sent", &[("endpoint", "get")]).inc();
    registry
        .counter("output_sent", &[("endpoint", "stream")])
        .add(5);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.counters.len(), 2);
    assert_eq!(snapshot.counter("output_sent", &[("endpoint", "get")]), Some(1));
    assert_eq!(
        snapshot.counter("output_sent", &[("endpoint", "stream")]),
        Some(5)
    );
    assert_eq!(snapshot.counter("output_sent", &[]), None);
}

#[test]
fn test_local_registry_timer_snapshot() {
    let registry = LocalRegistry::new();
    let timer = registry.timer("output_latency_ns", &[("endpoint", "get")]);
    timer.record(Duration::from_millis(2));

    let snapshot = registry.snapshot();
    let sample = snapshot
        .timer("output_latency_ns", &[("endpoint", "get")])
        .unwrap();
    assert_eq!(sample.count, 1);
    assert_eq!(sample.total_ns, 2_000_000);
    assert!(snapshot.timestamp.is_some());
}

// =============================================================================
// NoopRegistry
// =============================================================================

#[test]
fn test_noop_registry_reports_nothing() {
    let registry = noop();
    let counter = registry.counter("broker_forwarded", &[]);
    counter.inc();
    assert_eq!(counter.get(), 1);

    let snapshot = registry.snapshot();
    assert!(snapshot.is_empty());
    assert!(snapshot.timestamp.is_none());
}

// =============================================================================
// Rates
// =============================================================================

#[test]
fn test_rates_between_snapshots() {
    let start = Instant::now();
    let key = MetricKey::new("broker_forwarded", &[]);
    let timer_key = MetricKey::new("output_latency_ns", &[]);

    let previous = MetricsSnapshot {
        timestamp: Some(start),
        counters: vec![CounterSample {
            key: key.clone(),
            value: 100,
        }],
        timers: vec![TimerSample {
            key: timer_key.clone(),
            count: 10,
            total_ns: 1_000,
            max_ns: 200,
        }],
    };
    let current = MetricsSnapshot {
        timestamp: Some(start + Duration::from_secs(2)),
        counters: vec![CounterSample { key, value: 300 }],
        timers: vec![TimerSample {
            key: timer_key,
            count: 20,
            total_ns: 3_000,
            max_ns: 400,
        }],
    };

    let rates = current.rates(&previous).unwrap();
    assert!((rates.elapsed_secs - 2.0).abs() < f64::EPSILON);
    assert_eq!(rates.counters[0].total, 300);
    assert!((rates.counters[0].per_sec - 100.0).abs() < f64::EPSILON);
    assert_eq!(rates.timers[0].count, 10);
    assert_eq!(rates.timers[0].mean_ns, 200);
    assert_eq!(rates.timers[0].max_ns, 400);
}

#[test]
fn test_rates_need_timestamps() {
    let previous = MetricsSnapshot::default();
    let current = MetricsSnapshot {
        timestamp: Some(Instant::now()),
        ..Default::default()
    };
    assert!(current.rates(&previous).is_none());
}

#[test]
fn test_rates_new_metric_counts_from_zero() {
    let start = Instant::now();
    let previous = MetricsSnapshot {
        timestamp: Some(start),
        ..Default::default()
    };
    let current = MetricsSnapshot {
        timestamp: Some(start + Duration::from_secs(1)),
        counters: vec![CounterSample {
            key: MetricKey::new("output_error", &[]),
            value: 4,
        }],
        timers: Vec::new(),
    };

    let rates = current.rates(&previous).unwrap();
    assert!((rates.counters[0].per_sec - 4.0).abs() < f64::EPSILON);
}
