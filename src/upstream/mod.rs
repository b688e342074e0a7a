//! Upstream collaborators
//!
//! The gateway talks to three remote services besides its key/value store:
//! - the grant API, which applies time-limited read/write permissions
//! - a secret vault holding the signing secret
//! - plain HTTP, used for signed channel-group mutations
//!
//! Each is consumed through a narrow trait so the dispatch core never depends
//! on a concrete transport. Every call goes through [`with_deadline`].

mod pubnub;
mod vault;

pub use pubnub::{PubNubGrantClient, ReqwestFetcher};
pub use vault::{SecretVault, StaticVault, VaultError};

use crate::auth::{GrantRequest, SignError};
use crate::storage::StorageError;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failures of anything outside the gateway process
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{call} call timed out after {after:?}")]
    Timeout { call: &'static str, after: Duration },

    #[error("upstream responded with status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("signing error: {0}")]
    Signing(#[from] SignError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("grant not applied: {0}")]
    GrantRejected(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Raw reply of the grant API.
///
/// Kept as untyped JSON: the only field the gateway interprets is `message`,
/// and any other shape must still be representable so it can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantStatus(pub Value);

impl GrantStatus {
    /// The `message` field, if it is a string
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }
}

/// Response of a plain upstream GET
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an error
    pub fn error_for_status(self) -> Result<Self, UpstreamError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(UpstreamError::Status(self.status))
        }
    }
}

/// Applies permission grants upstream
#[async_trait]
pub trait GrantClient: Send + Sync {
    async fn grant(&self, request: &GrantRequest) -> Result<GrantStatus, UpstreamError>;
}

/// Issues a GET against an upstream URL
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, UpstreamError>;
}

/// Run an external call under a deadline.
///
/// Expiry is reported as [`UpstreamError::Timeout`]; the call's own error is
/// converted into an [`UpstreamError`].
pub async fn with_deadline<T, E, F>(call: &'static str, after: Duration, fut: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<UpstreamError>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(UpstreamError::Timeout { call, after }),
    }
}
