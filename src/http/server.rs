//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router catching every method and path
//! - Wire up middleware (CORS, access log)
//! - Serve on a bound listener until shutdown
//! - Dispatch every request to the forwarder

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::config::ProxyConfig;
use crate::http::forward::{Forwarder, ForwarderError};
use crate::http::hooks::{ForwardHooks, LoggingHooks};
use crate::http::response::restore_upstream_cors;
use crate::lifecycle::shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server whose hooks log each forwarded request.
    pub fn new(config: ProxyConfig) -> Result<Self, ForwarderError> {
        Self::with_hooks(config, Arc::new(LoggingHooks))
    }

    /// Create a server with custom forwarding hooks.
    pub fn with_hooks(
        config: ProxyConfig,
        hooks: Arc<dyn ForwardHooks>,
    ) -> Result<Self, ForwarderError> {
        let forwarder = Arc::new(Forwarder::new(&config, hooks)?);
        let router = Self::build_router(AppState { forwarder });
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer order, outermost first: access log, upstream CORS restore,
    /// permissive CORS. CORS wraps the handler directly so proxy error
    /// responses carry the headers too.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                            .on_response(
                                DefaultOnResponse::new()
                                    .level(Level::INFO)
                                    .latency_unit(LatencyUnit::Millis),
                            ),
                    )
                    .layer(middleware::map_response(restore_upstream_cors))
                    .layer(CorsLayer::permissive()),
            )
    }

    /// The fully layered router, for serving it elsewhere or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on the given listener until `shutdown_rx` fires.
    ///
    /// In-flight requests are drained before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: every method, every path.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    state.forwarder.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn unreachable_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.upstream.base_url = "http://127.0.0.1:1/v2".into();
        config.timeouts.connect_secs = 2;
        config
    }

    #[tokio::test]
    async fn preflight_answered_locally() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/pet")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn error_response_carries_cors_headers() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let request = Request::builder()
            .uri("/pet/1")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ProxyConfig::default();
        config.credential.header = "not a header".into();
        assert!(matches!(
            HttpServer::new(config),
            Err(ForwarderError::Validation(_))
        ));
    }
}
