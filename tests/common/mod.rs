//! Shared utilities for integration testing.
//!
//! Mock backends speak raw HTTP/1.1 over TCP so the tests control every
//! byte of the exchange. Process-spawning helpers lean on `sleep`/`sh`
//! as stand-ins for a real backend process; the HTTP side of the
//! backend is played by a mock listening on the configured address.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ondemand_proxy::config::SupervisorConfig;
use ondemand_proxy::http::HttpServer;
use ondemand_proxy::lifecycle::Shutdown;
use ondemand_proxy::supervisor::{BackendState, Supervisor};

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target as sent, query string included.
    pub target: String,
    /// Raw header block.
    pub head: String,
    pub body: Vec<u8>,
}

/// Base configuration for supervisor tests.
///
/// The "backend process" is a plain `sleep`; mock servers stand in for
/// the backend's HTTP surface. Shutdown timing is tightened so tests
/// stay fast.
#[allow(dead_code)]
pub fn test_config(proxy_port: u16, backend_port: u16) -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.listener.bind_address = format!("127.0.0.1:{proxy_port}");
    config.backend.command = "sleep".to_string();
    config.backend.args = vec!["300".to_string()];
    config.backend.address = format!("127.0.0.1:{backend_port}");
    config.idle.timeout_ms = 60_000;
    config.shutdown.graceful_request_timeout_secs = 1;
    config.shutdown.grace_period_secs = 2;
    config.health.status_timeout_secs = 1;
    config
}

/// Bind the listener, build the server, and serve it in the background.
#[allow(dead_code)]
pub async fn start_supervisor(config: SupervisorConfig) -> (Arc<Supervisor>, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .expect("test listener should bind");

    let supervisor = Supervisor::new(config.clone());
    let server = HttpServer::new(&config, supervisor.clone());

    let shutdown = Shutdown::new();
    let signaled = shutdown.signaled();
    tokio::spawn(async move {
        let _ = server.run(listener, signaled).await;
    });

    (supervisor, shutdown)
}

/// Stop the backend (if any) and tear the server down.
#[allow(dead_code)]
pub async fn teardown(supervisor: &Arc<Supervisor>, shutdown: &Shutdown) {
    supervisor.request_stop().await;
    shutdown.trigger();
}

/// Poll until the supervisor reaches the wanted state or the deadline
/// passes.
#[allow(dead_code)]
pub async fn wait_for_state(
    supervisor: &Supervisor,
    want: BackendState,
    deadline: Duration,
) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if supervisor.state() == want {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    supervisor.state() == want
}

/// A reqwest client that never picks up proxy settings from the
/// environment.
#[allow(dead_code)]
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("test client should build")
}

/// Start a mock backend that answers every request with 200 and a fixed
/// body.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_inspecting_backend(addr, move |_| (200, response.to_string())).await;
}

/// Start a mock backend that parses each request and lets the closure
/// pick the response.
#[allow(dead_code)]
pub async fn start_inspecting_backend<F>(addr: SocketAddr, f: F)
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .expect("mock backend should bind");
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let (status, body) = f(&request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a mock backend that records every request it sees.
///
/// Returns the shared request log.
#[allow(dead_code)]
pub async fn start_recording_backend(
    addr: SocketAddr,
    status: u16,
    body: &'static str,
) -> Arc<Mutex<Vec<RecordedRequest>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = log.clone();
    start_inspecting_backend(addr, move |request| {
        seen.lock().unwrap().push(request.clone());
        (status, body.to_string())
    })
    .await;
    log
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    // Read up to the end of the header block.
    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) => return None,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
                    break pos + 4;
                }
                if buf.len() > 64 * 1024 {
                    return None;
                }
            }
            Err(_) => return None,
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        match socket.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
            Err(_) => break,
        }
    }

    Some(RecordedRequest {
        method,
        target,
        head,
        body,
    })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        418 => "418 I'm a teapot",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}
