//! Gateway responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Empty,
    Json(Value),
    Text(&'static str),
}

/// The single response produced for one request
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl GatewayResponse {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ReplyBody::Empty,
        }
    }

    /// 200, no body
    pub fn ok() -> Self {
        Self::empty(StatusCode::OK)
    }

    /// 200 with a JSON body
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(value),
        }
    }

    pub fn text(status: StatusCode, text: &'static str) -> Self {
        Self {
            status,
            body: ReplyBody::Text(text),
        }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        match self.body {
            ReplyBody::Empty => self.status.into_response(),
            ReplyBody::Json(value) => (self.status, Json(value)).into_response(),
            ReplyBody::Text(text) => (self.status, text).into_response(),
        }
    }
}
