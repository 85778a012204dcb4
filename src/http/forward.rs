//! The forwarder: one inbound request in, one upstream attempt, one response out.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → join path + query onto the upstream base URL
//!     → buffer body (bounded by security.max_body_size)
//!     → copy headers, inject credential       → hooks.on_request
//!     → single upstream attempt
//!         ok  → relay status/headers/body     → hooks.on_response
//!         err → 500 {"error":"Proxy error"}   → hooks.on_error
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, Uri},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;
use url::Url;

use crate::config::{validation::validate_config, ProxyConfig, ValidationError};
use crate::http::headers::outbound_headers;
use crate::http::hooks::{ForwardHooks, OutboundRequest};
use crate::http::response::{describe, relay, ProxyError};
use crate::observability::metrics;

/// Errors building a [`Forwarder`].
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Forwards requests to the single configured upstream.
///
/// Holds only data fixed at startup; shared across request tasks via `Arc`.
pub struct Forwarder {
    client: reqwest::Client,
    base_url: String,
    credential: (HeaderName, HeaderValue),
    change_origin: bool,
    max_body_size: usize,
    hooks: Arc<dyn ForwardHooks>,
}

impl Forwarder {
    /// Build a forwarder from a configuration.
    ///
    /// The configuration is validated again here so a forwarder can never
    /// hold an unusable base URL or credential.
    pub fn new(config: &ProxyConfig, hooks: Arc<dyn ForwardHooks>) -> Result<Self, ForwarderError> {
        validate_config(config).map_err(ForwarderError::Validation)?;

        let name = HeaderName::from_bytes(config.credential.header.as_bytes()).map_err(|e| {
            ForwarderError::Validation(vec![ValidationError::new("credential.header", e.to_string())])
        })?;
        let mut value = HeaderValue::from_str(&config.credential.value).map_err(|e| {
            ForwarderError::Validation(vec![ValidationError::new("credential.value", e.to_string())])
        })?;
        value.set_sensitive(true);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .pool_idle_timeout(Duration::from_secs(config.timeouts.idle_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: config.upstream.base_url.trim_end_matches('/').to_string(),
            credential: (name, value),
            change_origin: config.upstream.change_origin,
            max_body_size: config.security.max_body_size,
            hooks,
        })
    }

    /// Upstream base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward one request and produce the response for the caller.
    ///
    /// Never fails: transport errors are rendered as the proxy error body.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let target = match join_target(&self.base_url, &parts.uri) {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(uri = %parts.uri, "[PROXY ERROR] {}", e);
                return e.into_response();
            }
        };
        let outbound = OutboundRequest {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            target,
        };

        let body = match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.is::<LengthLimitError>() {
                    ProxyError::BodyTooLarge {
                        limit: self.max_body_size,
                    }
                } else {
                    ProxyError::BodyRead(describe(&*e))
                };
                tracing::warn!(
                    method = %outbound.method,
                    path = %outbound.path,
                    limit = self.max_body_size,
                    "{}",
                    err
                );
                return err.into_response();
            }
        };

        let (name, value) = &self.credential;
        let headers = outbound_headers(&parts.headers, (name, value), self.change_origin);

        self.hooks.on_request(&outbound);

        let sent = self
            .client
            .request(outbound.method.clone(), outbound.target.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        match sent {
            Ok(upstream) => {
                let status = upstream.status();
                self.hooks.on_response(&outbound, status);
                metrics::record_request(outbound.method.as_str(), status.as_u16(), start);

                let OutboundRequest { method, path, .. } = outbound;
                relay(upstream, move |e| {
                    tracing::error!(
                        method = %method,
                        path = %path,
                        "[PROXY ERROR] upstream body aborted: {}",
                        describe(e)
                    );
                    metrics::record_upstream_error();
                })
            }
            Err(e) => {
                let err = ProxyError::from_transport(&e);
                self.hooks.on_error(&outbound, &err);
                metrics::record_upstream_error();
                metrics::record_request(
                    outbound.method.as_str(),
                    err.status_code().as_u16(),
                    start,
                );
                err.into_response()
            }
        }
    }
}

/// Append the inbound path and query to the upstream base, verbatim.
pub fn join_target(base_url: &str, uri: &Uri) -> Result<Url, ProxyError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let joined = format!("{}{}", base_url.trim_end_matches('/'), path_and_query);
    Url::parse(&joined).map_err(|_| ProxyError::InvalidUpstreamUri(joined))
}
