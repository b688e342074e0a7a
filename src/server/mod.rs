//! Gateway server implementation
//!
//! Route table and dispatch, per-route handlers, and the axum HTTP surface.

mod handlers;
pub mod http;
mod response;
mod router;

pub use handlers::channel_group_path;
pub use http::{create_router, serve};
pub use response::{GatewayResponse, ReplyBody};
pub use router::{
    parse_method, Collaborators, Gateway, GatewayRequest, Handler, Route, RouteParams, RouteTable,
};
