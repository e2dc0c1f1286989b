//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and addresses of enabled listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TrackerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TrackerConfig;

/// Largest accepted `max_stack_frames`.
pub const STACK_FRAME_LIMIT: usize = 256;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("tracker.max_stack_frames must be between 1 and {limit}, got {value}")]
    StackFrames { value: usize, limit: usize },

    #[error("{field} is not a valid socket address: {value}")]
    Address { field: &'static str, value: String },

    #[error("observability.log_level is not a known level: {0}")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &TrackerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let frames = config.tracker.max_stack_frames;
    if frames == 0 || frames > STACK_FRAME_LIMIT {
        errors.push(ValidationError::StackFrames {
            value: frames,
            limit: STACK_FRAME_LIMIT,
        });
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}
