//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, CORS, access log)
//!     → forward.rs (target rewrite, body buffering, single upstream call)
//!     → headers.rs (hop-by-hop strip, credential injection)
//!     → hooks.rs (on_request / on_response / on_error)
//!     → response.rs (relay upstream response or render proxy error)
//!     → Send to client
//! ```

pub mod forward;
pub mod headers;
pub mod hooks;
pub mod response;
pub mod server;

pub use forward::{Forwarder, ForwarderError};
pub use hooks::{ForwardHooks, LoggingHooks, OutboundRequest};
pub use response::{ProxyError, UpstreamCors};
pub use server::HttpServer;
