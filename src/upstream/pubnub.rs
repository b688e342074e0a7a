//! reqwest-backed upstream clients

use crate::auth::{GrantRequest, QueryOptions, RequestSigner};
use crate::upstream::{FetchResponse, GrantClient, GrantStatus, HttpFetch, UpstreamError};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

/// Plain GET over a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, UpstreamError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        debug!(path = url.path(), status = status, "Upstream responded");
        Ok(FetchResponse { status, body })
    }
}

/// Grant API client speaking the access-manager v2 protocol.
///
/// A grant is a signed GET on `/v2/auth/grant/sub-key/{subscribe_key}` with
/// comma-joined `channel`, `channel-group` and `auth` lists and `r`/`w`/`ttl`
/// flags. The JSON reply is returned as-is for status interpretation.
pub struct PubNubGrantClient {
    signer: Arc<RequestSigner>,
    fetcher: Arc<dyn HttpFetch>,
}

impl PubNubGrantClient {
    pub fn new(signer: Arc<RequestSigner>, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { signer, fetcher }
    }

    /// Path of the grant endpoint for this keyset
    pub fn grant_path(&self) -> String {
        format!("/v2/auth/grant/sub-key/{}", self.signer.keys().subscribe_key)
    }

    /// Query options (before signing) for a grant
    pub fn grant_options(request: &GrantRequest) -> QueryOptions {
        let mut options = QueryOptions::new();
        let flag = |b: bool| (if b { "1" } else { "0" }).to_string();

        if !request.channels.is_empty() {
            options.insert("channel".into(), request.channels.join(","));
        }
        if !request.channel_groups.is_empty() {
            options.insert("channel-group".into(), request.channel_groups.join(","));
        }
        if !request.auth_keys.is_empty() {
            options.insert("auth".into(), request.auth_keys.join(","));
        }
        options.insert("r".into(), flag(request.read));
        options.insert("w".into(), flag(request.write));
        options.insert("ttl".into(), request.ttl.to_string());

        options
    }
}

#[async_trait]
impl GrantClient for PubNubGrantClient {
    async fn grant(&self, request: &GrantRequest) -> Result<GrantStatus, UpstreamError> {
        let url = self
            .signer
            .signed_url(&self.grant_path(), Self::grant_options(request))
            .await?;

        let response = self.fetcher.fetch(&url).await?;

        // Error replies carry a JSON body too; status handling decides.
        serde_json::from_str(&response.body)
            .map(GrantStatus)
            .map_err(|e| {
                UpstreamError::Decode(format!("grant reply (status {}): {}", response.status, e))
            })
    }
}
