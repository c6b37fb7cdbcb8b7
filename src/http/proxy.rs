//! Reverse-proxy handler.
//!
//! # Responsibilities
//! - Refuse with 503 while no backend process exists
//! - Count proxied traffic as activity (timer reset)
//! - Strip the proxy prefix and forward the request verbatim
//! - Relay the backend's response unchanged, application errors included
//!
//! # Failure Modes
//! Three cases stay distinct: the backend answered with an error
//! response (relayed as-is), the backend gave no response (502), and a
//! local fault while constructing the outbound request (500). None of
//! them touch lifecycle state; only the exit observer does that.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::supervisor::BackendState;

/// Namespace under which requests are forwarded to the backend.
pub const PROXY_PREFIX: &str = "/proxy";

/// Forward one request under the proxy namespace to the backend.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if state.supervisor.state() != BackendState::Running {
        tracing::debug!(
            request_id = %request_id,
            path = %path,
            "proxy request refused, backend not running"
        );
        metrics::record_proxy_request(method.as_str(), 503, start_time);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "backend server is not running or not ready" })),
        )
            .into_response();
    }

    // Proxied traffic counts as activity; status polling does not.
    state.supervisor.note_activity();

    let (parts, body) = request.into_parts();

    let target = rewrite_target(&parts.uri);
    let uri: Uri = match format!("http://{}{}", state.backend_address, target).parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "failed to build backend uri");
            metrics::record_proxy_request(method.as_str(), 500, start_time);
            return proxy_fault();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "forwarding request to backend"
    );

    let mut forwarded = Request::builder().method(parts.method).uri(uri);
    if let Some(headers) = forwarded.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    let forwarded = match forwarded.body(body) {
        Ok(forwarded) => forwarded,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "failed to build backend request");
            metrics::record_proxy_request(method.as_str(), 500, start_time);
            return proxy_fault();
        }
    };

    match state.client.request(forwarded).await {
        Ok(response) => {
            // Relay status and body unchanged; an application-level
            // error from the backend is the backend's answer, not ours.
            let status = response.status();
            metrics::record_proxy_request(method.as_str(), status.as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "no response from backend");
            metrics::record_proxy_request(method.as_str(), 502, start_time);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "no response from backend; it may be starting or may have crashed"
                })),
            )
                .into_response()
        }
    }
}

fn proxy_fault() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "proxy error during request processing" })),
    )
        .into_response()
}

/// Strip the proxy prefix from a request URI, keeping the query string.
fn rewrite_target(uri: &Uri) -> String {
    let path = uri.path();
    let stripped = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    let stripped = if stripped.is_empty() { "/" } else { stripped };

    match uri.query() {
        Some(query) => format!("{stripped}?{query}"),
        None => stripped.to_string(),
    }
}
