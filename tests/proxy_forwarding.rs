//! Integration tests for the reverse-proxy namespace.

use std::net::SocketAddr;
use std::time::Duration;

use ondemand_proxy::supervisor::BackendState;
use serde_json::Value;

mod common;

#[tokio::test]
async fn test_503_when_backend_absent() {
    let config = common::test_config(47710, 47711);
    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    let response = client
        .get("http://127.0.0.1:47710/proxy/api/ask")
        .send()
        .await
        .expect("supervisor unreachable");
    assert_eq!(response.status(), 503);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not running"));

    // Refusal never touches lifecycle state.
    assert_eq!(supervisor.state(), BackendState::Absent);

    common::teardown(&supervisor, &shutdown).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_forward_rewrites_path_and_relays_response() {
    let config = common::test_config(47712, 47713);
    let backend_addr: SocketAddr = "127.0.0.1:47713".parse().unwrap();
    let seen = common::start_recording_backend(backend_addr, 200, "hello from backend").await;

    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    client
        .post("http://127.0.0.1:47712/control/start")
        .send()
        .await
        .unwrap();

    let response = client
        .get("http://127.0.0.1:47712/proxy/api/search?q=rust&page=2")
        .header("x-custom-header", "forwarded")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello from backend");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    // Prefix stripped, query preserved.
    assert_eq!(requests[0].target, "/api/search?q=rust&page=2");
    // Headers forwarded verbatim; request ID propagated.
    assert!(requests[0].head.contains("x-custom-header: forwarded"));
    assert!(requests[0].head.to_lowercase().contains("x-request-id"));

    common::teardown(&supervisor, &shutdown).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_backend_error_response_relayed_as_is() {
    let config = common::test_config(47714, 47715);
    let backend_addr: SocketAddr = "127.0.0.1:47715".parse().unwrap();
    common::start_inspecting_backend(backend_addr, |_| {
        (500, "backend exploded".to_string())
    })
    .await;

    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    client
        .post("http://127.0.0.1:47714/control/start")
        .send()
        .await
        .unwrap();

    let response = client
        .get("http://127.0.0.1:47714/proxy/api/broken")
        .send()
        .await
        .unwrap();

    // The backend's own error answer, not a proxy-generated one.
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "backend exploded");

    common::teardown(&supervisor, &shutdown).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_no_response_reported_distinctly() {
    // The child process runs, but nothing listens on the backend address.
    let config = common::test_config(47716, 47717);
    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    client
        .post("http://127.0.0.1:47716/control/start")
        .send()
        .await
        .unwrap();
    let pid = supervisor.current_pid().expect("child should exist");

    let response = client
        .get("http://127.0.0.1:47716/proxy/api/ask")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no response"));

    // A forwarding failure never changes process state.
    assert_eq!(supervisor.state(), BackendState::Running);
    assert_eq!(supervisor.current_pid(), Some(pid));

    common::teardown(&supervisor, &shutdown).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_post_body_forwarded_verbatim() {
    let config = common::test_config(47718, 47719);
    let backend_addr: SocketAddr = "127.0.0.1:47719".parse().unwrap();
    let seen = common::start_recording_backend(backend_addr, 200, "{\"answer\":42}").await;

    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    client
        .post("http://127.0.0.1:47718/control/start")
        .send()
        .await
        .unwrap();

    let payload = "{\"question\":\"what is the answer?\"}";
    let response = client
        .post("http://127.0.0.1:47718/proxy/api/ask")
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "{\"answer\":42}");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/api/ask");
    assert_eq!(requests[0].body, payload.as_bytes());

    common::teardown(&supervisor, &shutdown).await;
}

/// Steady proxied traffic keeps pushing the idle deadline out; once the
/// traffic stops, the backend is shut down.
#[cfg(unix)]
#[tokio::test]
async fn test_proxied_traffic_defers_idle_shutdown() {
    let mut config = common::test_config(47720, 47721);
    config.idle.timeout_ms = 600;
    let backend_addr: SocketAddr = "127.0.0.1:47721".parse().unwrap();
    common::start_mock_backend(backend_addr, "pong").await;

    let (supervisor, shutdown) = common::start_supervisor(config).await;
    let client = common::test_client();

    client
        .post("http://127.0.0.1:47720/control/start")
        .send()
        .await
        .unwrap();

    // Six requests, each within the timeout window: total elapsed time
    // exceeds the timeout several times over, yet the backend survives.
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let response = client
            .get("http://127.0.0.1:47720/proxy/ping")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(supervisor.state(), BackendState::Running);
    }

    // Traffic stops; the deadline finally elapses.
    assert!(
        common::wait_for_state(&supervisor, BackendState::Absent, Duration::from_secs(8)).await,
        "backend should shut down once traffic stops"
    );

    common::teardown(&supervisor, &shutdown).await;
}
