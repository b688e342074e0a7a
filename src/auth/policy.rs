//! Authorization policy
//!
//! Runs once per gated request, after topology validation and before the
//! handler. A `Deny` always becomes a 401.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Which family of rules applies to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyScope {
    /// Inviting another user into a chat
    Invite,
    /// Requesting access to a chat channel
    Grant,
    /// Everything else
    Default,
}

impl PolicyScope {
    pub fn for_route(route: &str) -> Self {
        match route {
            "invite" => PolicyScope::Invite,
            "grant" => PolicyScope::Grant,
            _ => PolicyScope::Default,
        }
    }
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyScope::Invite => write!(f, "invite"),
            PolicyScope::Grant => write!(f, "grant"),
            PolicyScope::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// What a policy gets to look at
#[derive(Debug, Clone, Copy)]
pub struct PolicyRequest<'a> {
    pub route: &'a str,
    pub global: Option<&'a str>,
    pub body: Option<&'a Value>,
}

/// Per-request authorization decision
#[async_trait]
pub trait AuthorizationPolicy: Send + Sync {
    async fn decide(&self, scope: PolicyScope, request: PolicyRequest<'_>) -> Decision;
}

/// Permits every known route
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AllowAll {
    // can this user invite?
    fn invite(&self, _request: &PolicyRequest<'_>) -> Decision {
        Decision::Allow
    }

    // is this user allowed in the channel they're trying to join?
    fn grant(&self, _request: &PolicyRequest<'_>) -> Decision {
        Decision::Allow
    }

    fn default_rule(&self, _request: &PolicyRequest<'_>) -> Decision {
        Decision::Allow
    }
}

#[async_trait]
impl AuthorizationPolicy for AllowAll {
    async fn decide(&self, scope: PolicyScope, request: PolicyRequest<'_>) -> Decision {
        match scope {
            PolicyScope::Invite => self.invite(&request),
            PolicyScope::Grant => self.grant(&request),
            PolicyScope::Default => self.default_rule(&request),
        }
    }
}
