//! HMAC request signing
//!
//! Upstream mutations that cannot carry a session are authenticated by
//! signing the query string:
//!
//! ```text
//! {subscribe_key}\n{publish_key}\n{path}\n{canonical params}
//! ```
//!
//! The canonical params are the options (including `timestamp`) sorted by key,
//! each value strictly percent-encoded, joined as `k=v` pairs with `&`.
//! The signature is HMAC-SHA256 keyed with the base64-decoded secret, encoded
//! as URL-safe base64 and appended as the `signature` param.

use crate::config::{Keyset, SECRET_KEY_NAME};
use crate::upstream::{with_deadline, SecretVault, UpstreamError};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine,
};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Query options; ordered so the canonical string is deterministic
pub type QueryOptions = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("signing secret is not valid base64: {0}")]
    SecretEncoding(#[from] base64::DecodeError),

    #[error("invalid signed url: {0}")]
    InvalidUrl(String),
}

/// Escaped by `encodeURIComponent`: everything but `A-Za-z0-9-_.!~*'()`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escaped in signed values: everything but `A-Za-z0-9-_.`
const STRICT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Percent-encode a URI component, leaving `A-Za-z0-9-_.!~*'()` literal
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Strict encoding used for signed values: additionally escapes `!~*'()`
pub fn quote(input: &str) -> String {
    utf8_percent_encode(input, STRICT).to_string()
}

/// Sorted, strictly encoded `k=v&k=v` string
pub fn canonical_params(options: &QueryOptions) -> String {
    options
        .iter()
        .map(|(k, v)| format!("{}={}", k, quote(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The exact bytes the signature covers
pub fn sign_string(keys: &Keyset, path: &str, canonical: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        keys.subscribe_key, keys.publish_key, path, canonical
    )
}

/// HMAC-SHA256 over `message`, keyed with the base64-decoded `secret`
pub fn hmac_signature(secret: &str, message: &str) -> Result<String, SignError> {
    let key = STANDARD.decode(secret.trim())?;
    let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A signed, single-use upstream request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub path: String,
    /// Final options, including `timestamp` and `signature`
    pub params: QueryOptions,
    pub timestamp: u64,
    pub signature: String,
}

impl SignedRequest {
    /// `https://{origin}{path}?{query}`
    pub fn url(&self, origin: &str) -> Result<Url, SignError> {
        let base = format!("https://{}{}", origin, self.path);
        Url::parse_with_params(&base, self.params.iter())
            .map_err(|e| SignError::InvalidUrl(e.to_string()))
    }
}

/// Signs upstream requests on behalf of one keyset
pub struct RequestSigner {
    keys: Keyset,
    vault: Arc<dyn SecretVault>,
    origin: String,
    call_timeout: Duration,
}

impl RequestSigner {
    pub fn new(keys: Keyset, vault: Arc<dyn SecretVault>, origin: impl Into<String>) -> Self {
        Self {
            keys,
            vault,
            origin: origin.into(),
            call_timeout: crate::config::DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Deadline for the vault lookup
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn keys(&self) -> &Keyset {
        &self.keys
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Sign with the current time
    pub async fn sign(&self, path: &str, options: QueryOptions) -> Result<SignedRequest, UpstreamError> {
        self.sign_at(path, options, unix_now()).await
    }

    /// Sign with an explicit timestamp
    pub async fn sign_at(
        &self,
        path: &str,
        mut options: QueryOptions,
        timestamp: u64,
    ) -> Result<SignedRequest, UpstreamError> {
        options.insert("timestamp".to_string(), timestamp.to_string());

        let canonical = canonical_params(&options);
        let message = sign_string(&self.keys, path, &canonical);

        let secret = with_deadline("vault", self.call_timeout, self.vault.get(SECRET_KEY_NAME)).await?;
        let signature = hmac_signature(&secret, &message)?;

        options.insert("signature".to_string(), signature.clone());

        Ok(SignedRequest {
            path: path.to_string(),
            params: options,
            timestamp,
            signature,
        })
    }

    /// Sign and resolve to the full upstream URL
    pub async fn signed_url(&self, path: &str, options: QueryOptions) -> Result<Url, UpstreamError> {
        let signed = self.sign(path, options).await?;
        Ok(signed.url(&self.origin)?)
    }
}
