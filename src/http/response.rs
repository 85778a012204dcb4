//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream response (status, headers, body) to the caller
//! - Stream the upstream body without buffering it
//! - Render forwarding failures as the fixed JSON error shape
//!
//! # Design Decisions
//! - Only transport failures become proxy errors; upstream 4xx/5xx pass through
//! - Once the head has been relayed a failure can only abort the body stream
//! - Access-Control-* headers set by the upstream win over the permissive defaults

use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::TryStreamExt;
use serde::Serialize;
use thiserror::Error;

use crate::http::headers::strip_hop_by_hop;

/// Value of the `error` field in every error body.
pub const PROXY_ERROR: &str = "Proxy error";

/// Failures while forwarding a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connect refusal, DNS failure, timeout or reset before the response head.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// The inbound path could not be joined onto the upstream base URL.
    #[error("invalid upstream target '{0}'")]
    InvalidUpstreamUri(String),

    /// The inbound body exceeded `security.max_body_size`.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The inbound body could not be read.
    #[error("request body unreadable: {0}")]
    BodyRead(String),
}

impl ProxyError {
    /// Build an upstream failure from a client error, keeping its cause chain.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        Self::UpstreamUnavailable(describe(err))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnavailable(_) | ProxyError::InvalidUpstreamUri(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// JSON body sent to the caller when forwarding fails.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: PROXY_ERROR,
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Flatten an error and its sources into one line.
///
/// The top-level client error only says which URL failed; the cause
/// (refused, timed out, DNS) lives further down the chain.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Access-Control-* headers the upstream sent, kept as a response extension
/// so they can be put back after the CORS layer has run.
#[derive(Debug, Clone, Default)]
pub struct UpstreamCors(pub HeaderMap);

impl UpstreamCors {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let cors: HeaderMap = headers
            .iter()
            .filter(|(name, _)| name.as_str().starts_with("access-control-"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        (!cors.is_empty()).then_some(Self(cors))
    }
}

/// Replace the CORS layer's headers with the upstream's own, when it sent any.
///
/// Must run outside `CorsLayer`, which overwrites allow-origin with `*`
/// while leaving the upstream's allow-credentials in place.
pub async fn restore_upstream_cors(mut response: Response) -> Response {
    if let Some(UpstreamCors(cors)) = response.extensions_mut().remove::<UpstreamCors>() {
        let headers = response.headers_mut();
        for name in cors.keys() {
            headers.remove(name);
        }
        for (name, value) in &cors {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}

/// Turn an upstream response into the response relayed to the caller.
///
/// `on_stream_error` runs if the upstream fails after the head was relayed.
pub fn relay<F>(upstream: reqwest::Response, on_stream_error: F) -> Response
where
    F: Fn(&reqwest::Error) + Send + Sync + 'static,
{
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let stream = upstream.bytes_stream().inspect_err(move |e| on_stream_error(e));

    let cors = UpstreamCors::from_headers(&headers);

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Some(cors) = cors {
        response.extensions_mut().insert(cors);
    }
    response
}
