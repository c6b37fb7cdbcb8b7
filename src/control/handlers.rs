//! Control-plane handlers.
//!
//! Start and stop acknowledge immediately: starting never waits for the
//! backend to become responsive, and stopping runs as a background task
//! because the graceful sequence can take several seconds.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;
use crate::supervisor::StatusReport;

#[derive(Serialize)]
pub struct Acknowledgment {
    pub message: &'static str,
}

/// POST /control/start
pub async fn start_backend(State(state): State<AppState>) -> Response {
    match state.supervisor.request_start().await {
        Ok(_) => Json(Acknowledgment {
            message: "backend start initiated",
        })
        .into_response(),
        Err(e) => {
            // Spawn failures are the one start error callers must see.
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /control/stop
pub async fn stop_backend(State(state): State<AppState>) -> Json<Acknowledgment> {
    let supervisor = Arc::clone(&state.supervisor);
    tokio::spawn(async move {
        supervisor.request_stop().await;
    });

    Json(Acknowledgment {
        message: "backend shutdown initiated",
    })
}

/// GET /control/status
pub async fn backend_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.supervisor.query_status().await)
}
