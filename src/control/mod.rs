//! Control plane for the supervised backend.
//!
//! Exposes start/stop/status over HTTP, optionally behind a bearer
//! token. These endpoints talk to the lifecycle controller directly and
//! never count as backend activity.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::control_auth_middleware;
use self::handlers::{backend_status, start_backend, stop_backend};
use crate::http::server::AppState;

pub fn setup_control_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/control/start", post(start_backend))
        .route("/control/stop", post(stop_backend))
        .route("/control/status", get(backend_status));

    if !state.control_api_key.is_empty() {
        router = router.layer(middleware::from_fn_with_state(
            state.clone(),
            control_auth_middleware,
        ));
    }

    router.with_state(state)
}
