//! HTTP surface
//!
//! `GET /` is the index; every other request is `/{route}` with optional
//! `channel`, `global` and `user` query params and an optional JSON body.
//! The permissive CORS headers are attached to every response.

use crate::server::router::{parse_method, Gateway, GatewayRequest, RouteParams};
use crate::server::GatewayResponse;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, Method,
    },
    routing::any,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS, PUT, DELETE";
pub const CORS_ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Build the gateway's axum router
pub fn create_router(gateway: Arc<Gateway>) -> Router {
    let preflight = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", any(index_handler))
        .route("/:route", any(route_handler))
        .with_state(gateway)
        .layer(TraceLayer::new_for_http())
        .layer(preflight)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(CORS_ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
}

/// Methods are matched case-insensitively; `get` arrives from hyper as an
/// extension method rather than `GET`.
fn normalize_method(method: Method) -> Method {
    parse_method(method.as_str()).unwrap_or(method)
}

async fn index_handler(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    Query(params): Query<RouteParams>,
    body: Bytes,
) -> GatewayResponse {
    let request = GatewayRequest::new("", normalize_method(method)).params(params).raw_body(&body);
    gateway.dispatch(request).await
}

async fn route_handler(
    State(gateway): State<Arc<Gateway>>,
    Path(route): Path<String>,
    method: Method,
    Query(params): Query<RouteParams>,
    body: Bytes,
) -> GatewayResponse {
    let request = GatewayRequest::new(route, normalize_method(method)).params(params).raw_body(&body);
    gateway.dispatch(request).await
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(bind_addr: SocketAddr, gateway: Arc<Gateway>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");

    axum::serve(listener, create_router(gateway))
        .with_graceful_shutdown(shutdown)
        .await
}
