//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TrackerConfig (validated, immutable)
//!     → lifecycle::startup builds the tracker, reporters and admin endpoint
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal (or absent) config files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, LogFormat, ObservabilityConfig, ReportConfig, ReportSignal, TrackerConfig,
    TrackerSettings,
};
pub use validation::{validate_config, ValidationError};
