//! Route table and request dispatch
//!
//! Dispatch order for one request:
//! 1. empty route + GET: index
//! 2. `user_state` + POST: handler runs directly, no channel check or policy
//! 3. known (route, method) with a valid global channel: policy, then handler
//! 4. anything else: 404

use crate::auth::{AuthorizationPolicy, GrantRoute, PolicyRequest, PolicyScope, RequestSigner};
use crate::channels::GlobalChannel;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::server::GatewayResponse;
use crate::storage::KvStore;
use crate::upstream::{GrantClient, HttpFetch};
use axum::http::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Known route names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Index,
    Bootstrap,
    UserRead,
    UserWrite,
    UserState,
    Grant,
    Chat,
    Group,
    Join,
    Leave,
    Invite,
    Reset,
}

impl Route {
    pub const ALL: [Route; 12] = [
        Route::Index,
        Route::Bootstrap,
        Route::UserRead,
        Route::UserWrite,
        Route::UserState,
        Route::Grant,
        Route::Chat,
        Route::Group,
        Route::Join,
        Route::Leave,
        Route::Invite,
        Route::Reset,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Index => "index",
            Route::Bootstrap => "bootstrap",
            Route::UserRead => "user_read",
            Route::UserWrite => "user_write",
            Route::UserState => "user_state",
            Route::Grant => "grant",
            Route::Chat => "chat",
            Route::Group => "group",
            Route::Join => "join",
            Route::Leave => "leave",
            Route::Invite => "invite",
            Route::Reset => "reset",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What runs for a (route, method) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Index,
    Grant(GrantRoute),
    ChatGet,
    ChatPost,
    UserStateGet,
    UserStatePost,
    Join,
    Leave,
    Invite,
}

/// Immutable (route, method) → handler map, built once at startup
#[derive(Debug, Clone)]
pub struct RouteTable {
    handlers: HashMap<(Route, Method), Handler>,
}

impl RouteTable {
    pub fn standard() -> Self {
        let entries = [
            (Route::Index, Method::GET, Handler::Index),
            (Route::Bootstrap, Method::POST, Handler::Grant(GrantRoute::Bootstrap)),
            (Route::UserRead, Method::POST, Handler::Grant(GrantRoute::UserRead)),
            (Route::UserWrite, Method::POST, Handler::Grant(GrantRoute::UserWrite)),
            (Route::UserState, Method::GET, Handler::UserStateGet),
            (Route::UserState, Method::POST, Handler::UserStatePost),
            (Route::Grant, Method::POST, Handler::Grant(GrantRoute::Grant)),
            (Route::Chat, Method::GET, Handler::ChatGet),
            (Route::Chat, Method::POST, Handler::ChatPost),
            (Route::Group, Method::POST, Handler::Grant(GrantRoute::Group)),
            (Route::Join, Method::POST, Handler::Join),
            (Route::Leave, Method::POST, Handler::Leave),
            (Route::Invite, Method::POST, Handler::Invite),
        ];

        let handlers = entries
            .into_iter()
            .map(|(route, method, handler)| ((route, method), handler))
            .collect();

        Self { handlers }
    }

    pub fn lookup(&self, route: Route, method: &Method) -> Option<Handler> {
        self.handlers.get(&(route, method.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Parse a method name case-insensitively
pub fn parse_method(s: &str) -> Option<Method> {
    Method::from_bytes(s.trim().to_ascii_uppercase().as_bytes()).ok()
}

/// Route-dependent query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteParams {
    pub channel: Option<String>,
    pub global: Option<String>,
    pub user: Option<String>,
}

/// One inbound request, transport independent
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub route: String,
    pub method: Method,
    pub params: RouteParams,
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn new(route: impl Into<String>, method: Method) -> Self {
        Self {
            route: route.into(),
            method,
            params: RouteParams::default(),
            body: None,
        }
    }

    pub fn params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    /// Attach a body; JSON `null` counts as no body
    pub fn body(mut self, body: Value) -> Self {
        self.body = match body {
            Value::Null => None,
            other => Some(other),
        };
        self
    }

    /// Attach a raw body; empty or unparsable bytes count as no body
    pub fn raw_body(mut self, bytes: &[u8]) -> Self {
        self.body = None;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return self;
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => self.body(value),
            Err(e) => {
                debug!(error = %e, "Ignoring unparsable request body");
                self
            }
        }
    }

    /// The global channel the caller claims: `body.global` when a body is
    /// present, otherwise the `global` route param
    pub fn claimed_global(&self) -> Option<&str> {
        match &self.body {
            Some(body) => body.get("global").and_then(Value::as_str),
            None => self.params.global.as_deref(),
        }
    }
}

/// External collaborators the handlers call out to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KvStore>,
    pub grants: Arc<dyn GrantClient>,
    pub signer: Arc<RequestSigner>,
    pub fetcher: Arc<dyn HttpFetch>,
    pub policy: Arc<dyn AuthorizationPolicy>,
}

/// The dispatcher. Holds no per-request state.
pub struct Gateway {
    pub(crate) table: RouteTable,
    pub(crate) store: Arc<dyn KvStore>,
    pub(crate) grants: Arc<dyn GrantClient>,
    pub(crate) signer: Arc<RequestSigner>,
    pub(crate) fetcher: Arc<dyn HttpFetch>,
    pub(crate) policy: Arc<dyn AuthorizationPolicy>,
    pub(crate) call_timeout: Duration,
}

impl Gateway {
    pub fn new(config: &GatewayConfig, collaborators: Collaborators) -> Self {
        Self {
            table: RouteTable::standard(),
            store: collaborators.store,
            grants: collaborators.grants,
            signer: collaborators.signer,
            fetcher: collaborators.fetcher,
            policy: collaborators.policy,
            call_timeout: config.call_timeout,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Handle one request, producing exactly one response
    pub async fn dispatch(&self, request: GatewayRequest) -> GatewayResponse {
        let span = info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            route = %request.route,
            method = %request.method,
        );

        async {
            match self.route(&request).await {
                Ok(response) => {
                    debug!(status = response.status.as_u16(), "Request handled");
                    response
                }
                Err(err) => {
                    match &err {
                        GatewayError::Upstream(cause) => error!(error = %cause, "Upstream failure"),
                        GatewayError::Unauthorized(_) => warn!(error = %err, "Request denied"),
                        _ => info!(error = %err, "Request rejected"),
                    }
                    err.to_response()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn route(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if request.route.is_empty() && request.method == Method::GET {
            return self.run(Handler::Index, request).await;
        }

        if request.route == Route::UserState.as_str() && request.method == Method::POST {
            return self.run(Handler::UserStatePost, request).await;
        }

        let handler = Route::parse(&request.route)
            .and_then(|route| self.table.lookup(route, &request.method))
            .ok_or_else(|| GatewayError::NotFound {
                route: request.route.clone(),
                method: request.method.to_string(),
            })?;

        let global = request.claimed_global();
        GlobalChannel::parse(global)?;

        let scope = PolicyScope::for_route(&request.route);
        let decision = self
            .policy
            .decide(
                scope,
                PolicyRequest {
                    route: &request.route,
                    global,
                    body: request.body.as_ref(),
                },
            )
            .await;

        if !decision.is_allowed() {
            return Err(GatewayError::Unauthorized(request.route.clone()));
        }

        self.run(handler, request).await
    }
}
