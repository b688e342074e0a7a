//! Request-level errors and their status mapping
//!
//! - `Validation`: invalid global channel or malformed body, 404 like an
//!   unknown route so probing clients learn nothing about the namespace
//! - `NotFound`: no handler for (route, method), 404
//! - `Unauthorized`: policy said no, 401
//! - `Upstream`: store, vault, signing, grant API or fetch failed, 500

use crate::channels::ChannelError;
use crate::server::GatewayResponse;
use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use thiserror::Error;

/// Body sent with every 500; the cause is only logged
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no handler for {method} '{route}'")]
    NotFound { route: String, method: String },

    #[error("authorization denied for route '{0}'")]
    Unauthorized(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    pub fn validation(reason: impl std::fmt::Display) -> Self {
        GatewayError::Validation(reason.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response a caller sees. Never carries the error text.
    pub fn to_response(&self) -> GatewayResponse {
        match self {
            GatewayError::Upstream(_) => GatewayResponse::text(self.status(), INTERNAL_ERROR_BODY),
            _ => GatewayResponse::empty(self.status()),
        }
    }
}

impl From<ChannelError> for GatewayError {
    fn from(err: ChannelError) -> Self {
        GatewayError::validation(err)
    }
}
