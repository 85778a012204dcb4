//! Petstore API forwarding proxy library.
//!
//! Every inbound request is forwarded to one fixed upstream with an injected
//! credential header; the upstream response is relayed back unchanged.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
