//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracker, reporters, admin endpoint produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (live in-flight gauge)
//!
//! Consumers:
//!     → stdout/stderr (pretty or JSON)
//!     → Prometheus scrape (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing`
//! - Metrics are live values only; no history is aggregated
//! - Without an installed recorder, metric updates are no-ops

pub mod logging;
pub mod metrics;
