//! Client-side HTTP call tracker.
//!
//! Wraps an HTTP client's transport so every outbound request is registered
//! when it starts and released when its response body is closed, and reports
//! the requests still in flight on demand.

pub mod admin;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod reporter;
pub mod tracker;

pub use config::schema::TrackerConfig;
pub use error::{escape_format, is_http_status, HttpError};
pub use lifecycle::Shutdown;
pub use tracker::{HttpTracker, TrackedBody, TrackedService, TrackerLayer, TrackerOptions};
