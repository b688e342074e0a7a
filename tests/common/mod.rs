//! Shared fakes for gateway integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chatgate::auth::{AuthorizationPolicy, Decision, GrantRequest, PolicyRequest, PolicyScope, RequestSigner};
use chatgate::config::{GatewayConfig, Keyset, SECRET_KEY_NAME};
use chatgate::server::{Collaborators, Gateway};
use chatgate::storage::{KvStore, MemoryStore, StorageError};
use chatgate::upstream::{FetchResponse, GrantClient, GrantStatus, HttpFetch, StaticVault, UpstreamError};
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// base64("integration-secret")
pub const TEST_SECRET_B64: &str = "aW50ZWdyYXRpb24tc2VjcmV0";
pub const SUB_KEY: &str = "sub-c-test";
pub const PUB_KEY: &str = "pub-c-test";
pub const ORIGIN: &str = "ps.example.test";

/// Grant client that records every request and answers with a fixed reply
pub struct FakeGrants {
    pub reply: Mutex<Result<Value, ()>>,
    pub seen: Mutex<Vec<GrantRequest>>,
}

impl FakeGrants {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply: Mutex::new(Ok(reply)),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn success() -> Self {
        Self::replying(json!({"message": "Success", "status": 200}))
    }

    pub fn failing() -> Self {
        Self {
            reply: Mutex::new(Err(())),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GrantRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl GrantClient for FakeGrants {
    async fn grant(&self, request: &GrantRequest) -> Result<GrantStatus, UpstreamError> {
        self.seen.lock().push(request.clone());
        match &*self.reply.lock() {
            Ok(value) => Ok(GrantStatus(value.clone())),
            Err(()) => Err(UpstreamError::Transport("connection reset".into())),
        }
    }
}

/// Fetcher that records URLs and answers with a fixed status
pub struct FakeFetcher {
    pub status: u16,
    pub seen: Mutex<Vec<Url>>,
}

impl FakeFetcher {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<Url> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl HttpFetch for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, UpstreamError> {
        self.seen.lock().push(url.clone());
        Ok(FetchResponse {
            status: self.status,
            body: r#"{"status":200,"message":"OK","service":"channel-registry","error":false}"#.into(),
        })
    }
}

/// Policy with a fixed decision that counts how often it is consulted
pub struct CountingPolicy {
    pub decision: Decision,
    pub calls: AtomicUsize,
    pub scopes: Mutex<Vec<PolicyScope>>,
}

impl CountingPolicy {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationPolicy for CountingPolicy {
    async fn decide(&self, scope: PolicyScope, _request: PolicyRequest<'_>) -> Decision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes.lock().push(scope);
        self.decision
    }
}

/// Store whose calls never complete
pub struct HangingStore;

#[async_trait]
impl KvStore for HangingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl_minutes: u32) -> Result<(), StorageError> {
        std::future::pending().await
    }
}

/// Store that always fails
pub struct BrokenStore;

#[async_trait]
impl KvStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Database("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl_minutes: u32) -> Result<(), StorageError> {
        Err(StorageError::Database("connection refused".into()))
    }
}

/// A gateway wired to fakes, plus handles to inspect them
pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub store: Arc<dyn KvStore>,
    pub grants: Arc<FakeGrants>,
    pub fetcher: Arc<FakeFetcher>,
    pub policy: Arc<CountingPolicy>,
}

pub struct HarnessBuilder {
    store: Arc<dyn KvStore>,
    grants: FakeGrants,
    fetch_status: u16,
    decision: Decision,
    vault: StaticVault,
    call_timeout: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            grants: FakeGrants::success(),
            fetch_status: 200,
            decision: Decision::Allow,
            vault: StaticVault::new().with_secret(SECRET_KEY_NAME, TEST_SECRET_B64),
            call_timeout: Duration::from_secs(5),
        }
    }

    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = store;
        self
    }

    pub fn grants(mut self, grants: FakeGrants) -> Self {
        self.grants = grants;
        self
    }

    pub fn fetch_status(mut self, status: u16) -> Self {
        self.fetch_status = status;
        self
    }

    pub fn decision(mut self, decision: Decision) -> Self {
        self.decision = decision;
        self
    }

    pub fn vault(mut self, vault: StaticVault) -> Self {
        self.vault = vault;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn build(self) -> Harness {
        let keys = Keyset::new(SUB_KEY, PUB_KEY);
        let config = GatewayConfig::new("127.0.0.1:0".parse().unwrap(), keys.clone())
            .upstream_origin(ORIGIN)
            .call_timeout(self.call_timeout);

        let signer = Arc::new(
            RequestSigner::new(keys, Arc::new(self.vault), ORIGIN).call_timeout(self.call_timeout),
        );
        let grants = Arc::new(self.grants);
        let fetcher = Arc::new(FakeFetcher::with_status(self.fetch_status));
        let policy = Arc::new(CountingPolicy::new(self.decision));

        let gateway = Gateway::new(
            &config,
            Collaborators {
                store: self.store.clone(),
                grants: grants.clone(),
                signer,
                fetcher: fetcher.clone(),
                policy: policy.clone(),
            },
        );

        Harness {
            gateway: Arc::new(gateway),
            store: self.store,
            grants,
            fetcher,
            policy,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}
