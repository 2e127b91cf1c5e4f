//! HTTP Server Output - serve transactions to HTTP clients
//!
//! Clients pull batches instead of the output pushing them. Nothing is
//! read from the inbound stream until a client asks.
//!
//! # Endpoints
//!
//! - `GET /get` - one batch per request (`application/octet-stream`, or
//!   `multipart/form-data` for several parts)
//! - `GET /get/stream` - chunked body of newline-delimited batches
//! - `GET /get/ws` - websocket, one binary frame per part
//!
//! # Status Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 405 | verb not in `allowed_verbs` |
//! | 408 | no batch arrived before `timeout` |
//! | 503 | output closing, or upstream ended |
//!
//! # Serving
//!
//! With an `address` the output binds its own listener on `consume` and
//! shuts it down gracefully on close. Without one, `router()` returns the
//! routes for the caller to mount in its own server.

mod config;
mod handlers;
mod metrics;
mod response;

#[cfg(test)]
#[path = "http_server_test.rs"]
mod http_server_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::http::Method;
use axum::routing::any;
use conduit_component::{Closable, ComponentError, Lifecycle, Streamed, reject_pending};
use conduit_message::TransactionRx;
use conduit_metrics::Registry;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub use config::HttpServerConfig;
pub use metrics::{EndpointMetrics, HttpServerMetrics};

use handlers::{HandlerState, get_message, stream_messages, websocket};

/// `Streamed` output that hands transactions to HTTP clients
pub struct HttpServerOutput {
    config: HttpServerConfig,
    state: Arc<HandlerState>,
    /// Set once the serving task is spawned; it then owns `mark_closed`
    serving: AtomicBool,
}

impl HttpServerOutput {
    /// Create the output
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when no verb is allowed or a verb is not a valid
    /// HTTP method.
    pub fn new(config: HttpServerConfig, registry: &dyn Registry) -> Result<Self, ComponentError> {
        if config.allowed_verbs.is_empty() {
            return Err(ComponentError::invalid_config(
                "must provide at least one allowed verb",
            ));
        }

        let allowed_verbs = config
            .allowed_verbs
            .iter()
            .map(|verb| {
                Method::from_bytes(verb.as_bytes()).map_err(|_| {
                    ComponentError::invalid_config(format!("invalid http verb: {verb}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let state = Arc::new(HandlerState {
            inbound: OnceLock::new(),
            lifecycle: Lifecycle::new(),
            allowed_verbs,
            timeout: config.timeout,
            metrics: HttpServerMetrics::new(registry),
        });

        Ok(Self {
            config,
            state,
            serving: AtomicBool::new(false),
        })
    }

    /// Routes for the configured endpoints
    ///
    /// Used internally when an address is configured; mount it in another
    /// server otherwise.
    pub fn router(&self) -> Router {
        build_router(&self.config, Arc::clone(&self.state))
    }

    /// Get the configuration
    #[inline]
    pub fn config(&self) -> &HttpServerConfig {
        &self.config
    }
}

/// Build the axum router, skipping endpoints with an empty path
fn build_router(config: &HttpServerConfig, state: Arc<HandlerState>) -> Router {
    let mut router = Router::new();
    if !config.path.is_empty() {
        router = router.route(&config.path, any(get_message));
    }
    if !config.stream_path.is_empty() {
        router = router.route(&config.stream_path, any(stream_messages));
    }
    if !config.ws_path.is_empty() {
        router = router.route(&config.ws_path, any(websocket));
    }
    router.with_state(state)
}

/// Serve until close, then reject whatever is left in the inbound slot
async fn serve(address: Option<String>, router: Router, state: Arc<HandlerState>) {
    let _closed = state.lifecycle.closed_guard();
    let close = state.lifecycle.close_token();

    match address {
        Some(address) => match TcpListener::bind(&address).await {
            Ok(listener) => {
                tracing::info!(address = %address, "http server output listening");
                let server = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { close.cancelled().await });
                if let Err(e) = server.await {
                    tracing::error!(address = %address, error = %e, "http server output failed");
                }
                state.lifecycle.trigger_close();
            }
            Err(source) => {
                let err = ComponentError::Bind { address, source };
                tracing::error!(error = %err, "http server output closing");
                state.lifecycle.trigger_close();
            }
        },
        None => close.cancelled().await,
    }

    if let Some(inbound) = state.inbound.get() {
        let rejected = reject_pending(&mut *inbound.lock().await);
        if rejected > 0 {
            tracing::debug!(rejected, "rejected buffered transactions on close");
        }
    }

    tracing::info!("http server output stopped");
}

#[async_trait]
impl Closable for HttpServerOutput {
    fn close_async(&self) {
        self.state.lifecycle.trigger_close();
        if !self.serving.load(Ordering::Acquire) {
            // No serving task to finish teardown
            self.state.lifecycle.mark_closed();
        }
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), ComponentError> {
        self.state.lifecycle.wait_for_close(timeout).await
    }
}

impl Streamed for HttpServerOutput {
    fn consume(&mut self, rx: TransactionRx) -> Result<(), ComponentError> {
        self.state.lifecycle.start()?;
        self.state
            .inbound
            .set(Mutex::new(rx))
            .map_err(|_| ComponentError::AlreadyStarted)?;

        self.serving.store(true, Ordering::Release);
        tokio::spawn(serve(
            self.config.address.clone(),
            self.router(),
            Arc::clone(&self.state),
        ));
        Ok(())
    }

    fn connected(&self) -> bool {
        true
    }
}
