//! HTTP server output configuration

use std::time::Duration;

/// Default single-shot endpoint
const DEFAULT_PATH: &str = "/get";

/// Default continuous stream endpoint
const DEFAULT_STREAM_PATH: &str = "/get/stream";

/// Default websocket endpoint
const DEFAULT_WS_PATH: &str = "/get/ws";

/// Default single-shot request deadline
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP server output configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig {
    /// Listen address (None = router is served by the caller via `router()`)
    pub address: Option<String>,

    /// Single-shot endpoint, empty to disable
    pub path: String,

    /// Continuous stream endpoint, empty to disable
    pub stream_path: String,

    /// Websocket endpoint, empty to disable
    pub ws_path: String,

    /// Verbs accepted on the single-shot and stream endpoints
    pub allowed_verbs: Vec<String>,

    /// How long a single-shot request waits for a transaction
    pub timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: None,
            path: DEFAULT_PATH.into(),
            stream_path: DEFAULT_STREAM_PATH.into(),
            ws_path: DEFAULT_WS_PATH.into(),
            allowed_verbs: vec!["GET".into()],
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpServerConfig {
    /// Create config that binds its own listener
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Set the single-shot deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
