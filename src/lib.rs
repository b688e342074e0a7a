//! Chatgate - access-control gateway for hierarchical pub/sub chat namespaces
//!
//! Validates claimed global channels against the reserved topology grammar,
//! derives the minimal grants each route needs and applies them upstream, or
//! signs channel-group membership changes with HMAC-SHA256.

pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod upstream;

pub use auth::{AllowAll, AuthorizationPolicy, GrantRequest, RequestSigner};
pub use channels::{validate, GlobalChannel};
pub use config::{GatewayConfig, Keyset};
pub use error::GatewayError;
pub use server::{Collaborators, Gateway, GatewayRequest, GatewayResponse};
