//! Gateway configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default upstream pub/sub origin
pub const DEFAULT_UPSTREAM_ORIGIN: &str = "ps.pndsn.com";

/// Vault entry holding the HMAC signing secret
pub const SECRET_KEY_NAME: &str = "secretKey";

/// Default deadline applied to every external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// The caller-scoped keyset the gateway acts on behalf of
#[derive(Clone, PartialEq, Eq)]
pub struct Keyset {
    pub subscribe_key: String,
    pub publish_key: String,
}

impl Keyset {
    pub fn new(subscribe_key: impl Into<String>, publish_key: impl Into<String>) -> Self {
        Self {
            subscribe_key: subscribe_key.into(),
            publish_key: publish_key.into(),
        }
    }
}

impl std::fmt::Debug for Keyset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyset")
            .field("subscribe_key", &self.subscribe_key)
            .field("publish_key", &"[REDACTED]")
            .finish()
    }
}

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,
    /// Keyset used for grants and signed requests
    pub keys: Keyset,
    /// Upstream host, without scheme
    pub upstream_origin: String,
    /// Deadline for each vault, store, grant and fetch call
    pub call_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(bind_addr: SocketAddr, keys: Keyset) -> Self {
        Self {
            bind_addr,
            keys,
            upstream_origin: DEFAULT_UPSTREAM_ORIGIN.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn upstream_origin(mut self, origin: impl Into<String>) -> Self {
        self.upstream_origin = origin.into();
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}
