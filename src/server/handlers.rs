//! Route handlers
//!
//! Each handler makes at most one outbound call and turns its outcome into a
//! single response.

use crate::auth::{encode_uri_component, handle_status, GrantRoute, QueryOptions};
use crate::error::GatewayError;
use crate::server::router::{Gateway, GatewayRequest, Handler};
use crate::server::GatewayResponse;
use crate::storage::{chat_meta_key, user_state_key, RECORD_TTL_MINUTES};
use crate::upstream::with_deadline;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatMetaBody {
    chat: Value,
}

#[derive(Debug, Deserialize)]
struct UserStateBody {
    channel: String,
    uuid: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct MembershipChat {
    channel: String,
    group: String,
}

#[derive(Debug, Deserialize)]
struct MembershipBody {
    global: String,
    uuid: String,
    chat: MembershipChat,
}

/// Channel-group membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Add,
    Remove,
}

impl Membership {
    fn option_name(&self) -> &'static str {
        match self {
            Membership::Add => "add",
            Membership::Remove => "remove",
        }
    }
}

/// Channel-group registration path for a keyset and an already encoded group
pub fn channel_group_path(subscribe_key: &str, encoded_group: &str) -> String {
    format!(
        "/v1/channel-registration/sub-key/{}/channel-group/{}",
        subscribe_key, encoded_group
    )
}

fn decode_body<T: DeserializeOwned>(request: &GatewayRequest) -> Result<T, GatewayError> {
    let body = request
        .body
        .as_ref()
        .ok_or_else(|| GatewayError::validation("missing request body"))?;

    T::deserialize(body).map_err(GatewayError::validation)
}

fn required_param<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, GatewayError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::validation(format!("missing '{}' parameter", name)))
}

impl Gateway {
    pub(crate) async fn run(
        &self,
        handler: Handler,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        match handler {
            Handler::Index | Handler::Invite => Ok(GatewayResponse::ok()),
            Handler::Grant(route) => self.grant(route, request).await,
            Handler::ChatGet => self.chat_get(request).await,
            Handler::ChatPost => self.chat_post(request).await,
            Handler::UserStateGet => self.user_state_get(request).await,
            Handler::UserStatePost => self.user_state_post(request).await,
            Handler::Join => self.membership(Membership::Add, request).await,
            Handler::Leave => self.membership(Membership::Remove, request).await,
        }
    }

    async fn grant(
        &self,
        route: GrantRoute,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let body = request
            .body
            .as_ref()
            .ok_or_else(|| GatewayError::validation("missing request body"))?;
        let grant = route.build(body).map_err(GatewayError::validation)?;

        debug!(
            grant_route = %route,
            channels = grant.channels.len(),
            channel_groups = grant.channel_groups.len(),
            "Issuing grant"
        );

        let status = with_deadline("grant", self.call_timeout, self.grants.grant(&grant)).await?;
        handle_status(&status)?;

        Ok(GatewayResponse::ok())
    }

    async fn chat_get(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let channel = required_param(&request.params.channel, "channel")?;
        let key = chat_meta_key(channel);

        let value = with_deadline("store", self.call_timeout, self.store.get(&key)).await?;

        // A missing chat is not an error: the client creates it.
        Ok(match value {
            Some(chat) => GatewayResponse::json(json!({ "found": true, "chat": chat })),
            None => GatewayResponse::json(json!({ "found": false })),
        })
    }

    async fn chat_post(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let body: ChatMetaBody = decode_body(request)?;
        let channel = body
            .chat
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::validation("chat.channel must be a string"))?;
        let key = chat_meta_key(channel);

        with_deadline(
            "store",
            self.call_timeout,
            self.store.set(&key, &body.chat, RECORD_TTL_MINUTES),
        )
        .await?;

        Ok(GatewayResponse::ok())
    }

    async fn user_state_get(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let global = required_param(&request.params.global, "global")?;
        let user = required_param(&request.params.user, "user")?;
        let key = user_state_key(global, user);

        let state = with_deadline("store", self.call_timeout, self.store.get(&key)).await?;

        Ok(GatewayResponse::json(match state {
            Some(Value::Null) | None => json!({}),
            Some(state) => state,
        }))
    }

    async fn user_state_post(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let body: UserStateBody = decode_body(request)?;
        let key = user_state_key(&body.channel, &body.uuid);

        with_deadline(
            "store",
            self.call_timeout,
            self.store.set(&key, &body.data, RECORD_TTL_MINUTES),
        )
        .await?;

        Ok(GatewayResponse::ok())
    }

    async fn membership(
        &self,
        change: Membership,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let body: MembershipBody = decode_body(request)?;

        let group = encode_uri_component(&format!("{}#{}#{}", body.global, body.uuid, body.chat.group));
        let path = channel_group_path(&self.signer.keys().subscribe_key, &group);

        let mut options = QueryOptions::new();
        options.insert(change.option_name().to_string(), body.chat.channel);
        options.insert("uuid".to_string(), body.uuid);

        let url = self.signer.signed_url(&path, options).await?;
        debug!(path = %path, change = change.option_name(), "Updating channel group");

        with_deadline("fetch", self.call_timeout, self.fetcher.fetch(&url))
            .await?
            .error_for_status()?;

        Ok(GatewayResponse::ok())
    }
}
