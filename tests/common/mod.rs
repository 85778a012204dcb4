//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    Json, Router,
};
use petstore_proxy::http::{ForwardHooks, OutboundRequest, ProxyError};
use petstore_proxy::lifecycle::startup;
use petstore_proxy::{HttpServer, ProxyConfig, Shutdown};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `router` as a mock upstream on an ephemeral port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start a raw TCP backend that reads the request head, writes `response`
/// verbatim and closes.
///
/// An empty response closes the connection without answering.
pub async fn start_raw_backend(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Upstream handler that describes the request it received.
pub async fn echo(request: Request) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "api_key": header("api_key"),
        "host": header("host"),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Upstream handler that returns the request body unchanged.
pub async fn mirror(body: Body) -> (StatusCode, Body) {
    (StatusCode::OK, body)
}

/// Config pointing at `upstream` with the `/v2` base path, listening on an
/// ephemeral local port.
pub fn proxy_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("http://{}/v2", upstream);
    config
}

/// A running proxy; shuts down when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    spawn(HttpServer::new(config).unwrap()).await
}

pub async fn start_proxy_with_hooks(config: ProxyConfig, hooks: Arc<dyn ForwardHooks>) -> TestProxy {
    spawn(HttpServer::with_hooks(config, hooks).unwrap()).await
}

async fn spawn(server: HttpServer) -> TestProxy {
    let listener = startup::bind(server.config()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Hooks that record each event as a short line.
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ForwardHooks for RecordingHooks {
    fn on_request(&self, request: &OutboundRequest) {
        self.push(format!("request {} {} -> {}", request.method, request.path, request.target));
    }

    fn on_response(&self, request: &OutboundRequest, status: StatusCode) {
        self.push(format!("response {} {} {}", status.as_u16(), request.method, request.path));
    }

    fn on_error(&self, request: &OutboundRequest, _error: &ProxyError) {
        self.push(format!("error {} {}", request.method, request.path));
    }
}
