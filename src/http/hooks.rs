//! Extension points around the upstream call.

use axum::http::{Method, StatusCode};
use url::Url;

use crate::http::response::ProxyError;

/// What is about to be, or was, sent upstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Inbound path without the query string, as used in log lines.
    pub path: String,
    /// Full upstream target including the query string.
    pub target: Url,
}

/// Callbacks invoked synchronously around the single upstream attempt.
///
/// Exactly one of `on_response` or `on_error` follows each `on_request`.
pub trait ForwardHooks: Send + Sync {
    /// Called after the credential has been injected, before sending.
    fn on_request(&self, _request: &OutboundRequest) {}

    /// Called once the upstream response head has arrived.
    fn on_response(&self, _request: &OutboundRequest, _status: StatusCode) {}

    /// Called on a transport failure.
    fn on_error(&self, _request: &OutboundRequest, _error: &ProxyError) {}
}

/// Default hooks: one log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl ForwardHooks for LoggingHooks {
    fn on_request(&self, request: &OutboundRequest) {
        tracing::info!(target_url = %request.target, "[PROXY] {} {}", request.method, request.path);
    }

    fn on_response(&self, request: &OutboundRequest, status: StatusCode) {
        tracing::info!(
            "[RESPONSE] {} {} {}",
            status.as_u16(),
            request.method,
            request.path
        );
    }

    fn on_error(&self, request: &OutboundRequest, error: &ProxyError) {
        tracing::error!(
            method = %request.method,
            path = %request.path,
            "[PROXY ERROR] {}",
            error
        );
    }
}
