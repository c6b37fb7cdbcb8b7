//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router (control plane + proxy namespace)
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Bind to the listener and serve until shutdown
//!
//! # Design Decisions
//! - One hyper client instance is shared for all forwarded requests
//! - The supervisor is injected as shared state; handlers never own it

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::DefaultBodyLimit, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::SupervisorConfig;
use crate::control;
use crate::http::proxy::{proxy_handler, PROXY_PREFIX};
use crate::http::request::UuidRequestId;
use crate::supervisor::Supervisor;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub client: Client<HttpConnector, Body>,
    /// host:port the backend listens on.
    pub backend_address: String,
    /// Bearer token guarding the control plane; empty disables auth.
    pub control_api_key: String,
}

/// HTTP server for the supervisor.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &SupervisorConfig, supervisor: Arc<Supervisor>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            supervisor,
            client,
            backend_address: config.backend.address.clone(),
            control_api_key: config.control.api_key.clone(),
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &SupervisorConfig, state: AppState) -> Router {
        let control = control::setup_control_router(state.clone());

        Router::new()
            .route(PROXY_PREFIX, any(proxy_handler))
            .route(&format!("{PROXY_PREFIX}/{{*path}}"), any(proxy_handler))
            .with_state(state)
            .merge(control)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(DefaultBodyLimit::max(config.security.max_body_size)),
            )
    }

    /// Serve until the shutdown future resolves.
    ///
    /// The caller decides what shutdown means: in production it is
    /// "signal received and the backend has been stopped".
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
