//! Authorization and signing
//!
//! - `grants`: per-route grant construction and grant reply handling
//! - `policy`: the per-request allow/deny seam
//! - `signer`: HMAC-SHA256 signing of upstream query strings

pub mod grants;
mod policy;
mod signer;

pub use grants::{handle_status, GrantRequest, GrantRoute, GRANT_TTL_MINUTES};
pub use policy::{AllowAll, AuthorizationPolicy, Decision, PolicyRequest, PolicyScope};
pub use signer::{
    canonical_params, encode_uri_component, hmac_signature, quote, sign_string, QueryOptions,
    RequestSigner, SignError, SignedRequest,
};
