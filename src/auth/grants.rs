//! Permission grants
//!
//! One pure builder per grant-bearing route. Each takes the decoded request
//! body and returns the exact channel / channel-group list and flags sent to
//! the grant API. List order is part of the contract.

use crate::upstream::{GrantStatus, UpstreamError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime of every grant issued by the gateway, in minutes (one week)
pub const GRANT_TTL_MINUTES: u32 = 10080;

/// Success marker in a grant API reply
pub const GRANT_SUCCESS: &str = "Success";

/// Permissions to apply upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub channels: Vec<String>,
    pub channel_groups: Vec<String>,
    pub read: bool,
    pub write: bool,
    pub auth_keys: Vec<String>,
    /// Minutes
    pub ttl: u32,
}

impl GrantRequest {
    fn on_channels(channels: Vec<String>) -> Self {
        Self {
            channels,
            channel_groups: Vec::new(),
            read: false,
            write: false,
            auth_keys: Vec::new(),
            ttl: GRANT_TTL_MINUTES,
        }
    }

    fn on_groups(channel_groups: Vec<String>) -> Self {
        Self {
            channel_groups,
            ..Self::on_channels(Vec::new())
        }
    }

    fn read(mut self) -> Self {
        self.read = true;
        self
    }

    fn write(mut self) -> Self {
        self.write = true;
        self
    }

    fn auth_key(mut self, key: &str) -> Self {
        self.auth_keys.push(key.to_string());
        self
    }
}

/// Body of `user_read` / `user_write`
#[derive(Debug, Clone, Deserialize)]
pub struct UserGrantBody {
    pub global: String,
    pub uuid: String,
}

/// Body of `bootstrap`
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapBody {
    pub global: String,
    pub uuid: String,
    #[serde(rename = "authKey")]
    pub auth_key: String,
}

/// Body of `group`.
///
/// Clients send the auth key as lowercase `authkey` on this route only.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupBody {
    pub global: String,
    pub uuid: String,
    pub authkey: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRef {
    pub channel: String,
}

/// Body of `grant`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatGrantBody {
    pub chat: ChatRef,
    #[serde(rename = "authKey")]
    pub auth_key: String,
}

/// `{global}#user:{uuid}#read.*`, read only
pub fn user_read(body: &UserGrantBody) -> GrantRequest {
    GrantRequest::on_channels(vec![format!("{}#user:{}#read.*", body.global, body.uuid)]).read()
}

/// `{global}#user:{uuid}#write.*`, write only
pub fn user_write(body: &UserGrantBody) -> GrantRequest {
    GrantRequest::on_channels(vec![format!("{}#user:{}#write.*", body.global, body.uuid)]).write()
}

/// The global channel, its presence twin, the public chat space and the
/// caller's own user namespaces; read + write.
pub fn bootstrap(body: &BootstrapBody) -> GrantRequest {
    let g = &body.global;
    let u = &body.uuid;

    GrantRequest::on_channels(vec![
        g.clone(),
        format!("{}-pnpres", g),
        format!("{}#chat#public.*", g),
        format!("{}#user#{}#me.*", g, u),
        format!("{}#user#{}#read.*", g, u),
        format!("{}#user#{}#write.*", g, u),
    ])
    .read()
    .write()
    .auth_key(&body.auth_key)
}

/// Suffixes of the per-user channel groups
const GROUP_SUFFIXES: [&str; 6] = [
    "rooms",
    "rooms-pnpres",
    "system",
    "system-pnpres",
    "custom",
    "custom-pnpres",
];

/// Read access to the caller's six channel groups
pub fn group(body: &GroupBody) -> GrantRequest {
    let groups = GROUP_SUFFIXES
        .iter()
        .map(|suffix| format!("{}#{}#{}", body.global, body.uuid, suffix))
        .collect();

    GrantRequest::on_groups(groups).read().auth_key(&body.authkey)
}

/// Read + write on one chat channel and its presence twin
pub fn chat(body: &ChatGrantBody) -> GrantRequest {
    let channel = &body.chat.channel;

    GrantRequest::on_channels(vec![channel.clone(), format!("{}-pnpres", channel)])
        .read()
        .write()
        .auth_key(&body.auth_key)
}

/// Routes that end in a grant API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantRoute {
    UserRead,
    UserWrite,
    Bootstrap,
    Group,
    Grant,
}

impl GrantRoute {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user_read" => Some(GrantRoute::UserRead),
            "user_write" => Some(GrantRoute::UserWrite),
            "bootstrap" => Some(GrantRoute::Bootstrap),
            "group" => Some(GrantRoute::Group),
            "grant" => Some(GrantRoute::Grant),
            _ => None,
        }
    }

    /// Decode the route's body and run its builder
    pub fn build(&self, body: &serde_json::Value) -> Result<GrantRequest, serde_json::Error> {
        let request = match self {
            GrantRoute::UserRead => user_read(&UserGrantBody::deserialize(body)?),
            GrantRoute::UserWrite => user_write(&UserGrantBody::deserialize(body)?),
            GrantRoute::Bootstrap => bootstrap(&BootstrapBody::deserialize(body)?),
            GrantRoute::Group => group(&GroupBody::deserialize(body)?),
            GrantRoute::Grant => chat(&ChatGrantBody::deserialize(body)?),
        };
        Ok(request)
    }
}

impl fmt::Display for GrantRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GrantRoute::UserRead => "user_read",
            GrantRoute::UserWrite => "user_write",
            GrantRoute::Bootstrap => "bootstrap",
            GrantRoute::Group => "group",
            GrantRoute::Grant => "grant",
        };
        write!(f, "{}", name)
    }
}

/// Interpret a grant API reply: only `message == "Success"` counts.
pub fn handle_status(status: &GrantStatus) -> Result<(), UpstreamError> {
    match status.message() {
        Some(GRANT_SUCCESS) => Ok(()),
        Some(other) => Err(UpstreamError::GrantRejected(other.to_string())),
        None => Err(UpstreamError::GrantRejected(format!(
            "reply without message: {}",
            status.0
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bootstrap_grant() {
        let body = BootstrapBody {
            global: "acme".into(),
            uuid: "u1".into(),
            auth_key: "k".into(),
        };
        let grant = bootstrap(&body);

        assert_eq!(
            grant.channels,
            vec![
                "acme",
                "acme-pnpres",
                "acme#chat#public.*",
                "acme#user#u1#me.*",
                "acme#user#u1#read.*",
                "acme#user#u1#write.*",
            ]
        );
        assert!(grant.channel_groups.is_empty());
        assert!(grant.read);
        assert!(grant.write);
        assert_eq!(grant.ttl, 10080);
        assert_eq!(grant.auth_keys, vec!["k"]);
    }

    #[test]
    fn test_user_read_and_write_grants() {
        let body = UserGrantBody {
            global: "acme".into(),
            uuid: "u1".into(),
        };

        let read = user_read(&body);
        assert_eq!(read.channels, vec!["acme#user:u1#read.*"]);
        assert!(read.read);
        assert!(!read.write);
        assert!(read.auth_keys.is_empty());
        assert_eq!(read.ttl, GRANT_TTL_MINUTES);

        let write = user_write(&body);
        assert_eq!(write.channels, vec!["acme#user:u1#write.*"]);
        assert!(!write.read);
        assert!(write.write);
    }

    #[test]
    fn test_group_grant() {
        let grant = GrantRoute::Group
            .build(&json!({"global": "acme", "uuid": "u1", "authkey": "k2"}))
            .unwrap();

        assert!(grant.channels.is_empty());
        assert_eq!(
            grant.channel_groups,
            vec![
                "acme#u1#rooms",
                "acme#u1#rooms-pnpres",
                "acme#u1#system",
                "acme#u1#system-pnpres",
                "acme#u1#custom",
                "acme#u1#custom-pnpres",
            ]
        );
        assert!(grant.read);
        assert!(!grant.write);
        assert_eq!(grant.auth_keys, vec!["k2"]);
    }

    #[test]
    fn test_auth_key_casing_is_route_specific() {
        // group reads `authkey`, bootstrap and grant read `authKey`
        assert!(GrantRoute::Group
            .build(&json!({"global": "acme", "uuid": "u1", "authKey": "k"}))
            .is_err());
        assert!(GrantRoute::Bootstrap
            .build(&json!({"global": "acme", "uuid": "u1", "authkey": "k"}))
            .is_err());
        assert!(GrantRoute::Grant
            .build(&json!({"chat": {"channel": "c"}, "authkey": "k"}))
            .is_err());
    }

    #[test]
    fn test_chat_grant() {
        let grant = GrantRoute::Grant
            .build(&json!({"chat": {"channel": "acme#chat#public.lobby"}, "authKey": "k"}))
            .unwrap();

        assert_eq!(
            grant.channels,
            vec!["acme#chat#public.lobby", "acme#chat#public.lobby-pnpres"]
        );
        assert!(grant.read && grant.write);
        assert_eq!(grant.auth_keys, vec!["k"]);
    }

    #[test]
    fn test_grant_request_wire_shape() {
        let grant = user_read(&UserGrantBody {
            global: "g".into(),
            uuid: "u".into(),
        });
        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(
            value,
            json!({
                "channels": ["g#user:u#read.*"],
                "channelGroups": [],
                "read": true,
                "write": false,
                "authKeys": [],
                "ttl": 10080
            })
        );
    }

    #[test]
    fn test_grant_route_parse() {
        assert_eq!(GrantRoute::parse("bootstrap"), Some(GrantRoute::Bootstrap));
        assert_eq!(GrantRoute::parse("group").map(|r| r.to_string()), Some("group".into()));
        assert_eq!(GrantRoute::parse("join"), None);
    }

    #[test]
    fn test_handle_status() {
        assert!(handle_status(&GrantStatus(json!({"message": "Success", "status": 200}))).is_ok());
        assert!(handle_status(&GrantStatus(json!({"message": "Forbidden"}))).is_err());
        assert!(handle_status(&GrantStatus(json!({"status": 200}))).is_err());
        assert!(handle_status(&GrantStatus(json!({"error": {"message": "Success"}}))).is_err());
        assert!(handle_status(&GrantStatus(json!("Success"))).is_err());
    }
}
