//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::reporter::ReportFormat;
use crate::tracker::stack::MAX_STACK_FRAMES;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    /// What the tracker records.
    pub tracker: TrackerSettings,

    /// When and how reports are produced.
    pub report: ReportConfig,

    /// HTTP introspection endpoint.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Tracker recording settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Record the call stack that issued each request.
    pub track_stacks: bool,

    /// Maximum recorded frames per request.
    pub max_stack_frames: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            track_stacks: false,
            max_stack_frames: MAX_STACK_FRAMES,
        }
    }
}

/// Signal that requests a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSignal {
    /// No signal trigger.
    None,
    #[default]
    Usr1,
    Usr2,
    /// Raw signal 29: SIGINFO on BSD and macOS (Ctrl+T), SIGIO on Linux.
    Info,
}

/// Report trigger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Signal that triggers a report on stdout.
    pub signal: ReportSignal,

    /// Periodic report interval in seconds (0 = disabled).
    pub interval_secs: u64,

    /// Report rendering.
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            signal: ReportSignal::Usr1,
            interval_secs: 0,
            format: ReportFormat::Text,
        }
    }
}

/// Introspection endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve `/debug/httpclients`.
    pub enabled: bool,

    /// Bind address for the endpoint.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
