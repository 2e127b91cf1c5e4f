//! Rate limit metrics decorator tests

use std::sync::atomic::AtomicUsize;

use conduit_metrics::{LocalRegistry, noop};

use super::*;

/// Rate limit that records closes and replays scripted results
#[derive(Default)]
struct ScriptedRateLimit {
    closes: AtomicUsize,
    next: parking_lot::Mutex<Vec<Result<Duration, RateLimitError>>>,
}

#[async_trait]
impl RateLimit for ScriptedRateLimit {
    async fn access(&self) -> Result<Duration, RateLimitError> {
        self.next.lock().pop().unwrap_or(Ok(Duration::ZERO))
    }

    async fn close(&self) -> Result<(), RateLimitError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_close_reaches_inner() {
    let limit = MetricsRateLimit::new(ScriptedRateLimit::default(), noop().as_ref());

    limit.close().await.unwrap();
    assert_eq!(limit.inner().closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_reaches_inner_once() {
    let limit = MetricsRateLimit::new(ScriptedRateLimit::default(), noop().as_ref());

    limit.close().await.unwrap();
    limit.close().await.unwrap();
    limit.close().await.unwrap();
    assert_eq!(limit.inner().closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_access_passes_through_and_counts() {
    let registry = LocalRegistry::new();
    let inner = ScriptedRateLimit::default();
    // Popped from the back
    *inner.next.lock() = vec![
        Err(RateLimitError::Other("backend down".into())),
        Ok(Duration::from_millis(5)),
        Ok(Duration::ZERO),
    ];
    let limit = MetricsRateLimit::new(inner, &registry);

    assert_eq!(limit.access().await, Ok(Duration::ZERO));
    assert_eq!(limit.access().await, Ok(Duration::from_millis(5)));
    assert_eq!(
        limit.access().await,
        Err(RateLimitError::Other("backend down".into()))
    );

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.counter("rate_limit_checked", &[]), Some(3));
    assert_eq!(snapshot.counter("rate_limit_limited", &[]), Some(1));
    assert_eq!(snapshot.counter("rate_limit_error", &[]), Some(1));
}

#[tokio::test]
async fn test_wraps_local_rate_limit() {
    let limit = MetricsRateLimit::new(
        crate::LocalRateLimit::new(1, Duration::from_secs(60)),
        noop().as_ref(),
    );

    assert_eq!(limit.access().await, Ok(Duration::ZERO));
    assert!(limit.access().await.unwrap() > Duration::ZERO);

    limit.close().await.unwrap();
    assert_eq!(limit.access().await, Err(RateLimitError::Closed));
}
