//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! forwarder + hooks produce:
//!     → logging.rs (structured log events, access log)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing`; `RUST_LOG` overrides the configured level
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
