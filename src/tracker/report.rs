//! Rendering of in-flight request snapshots.
//!
//! # Responsibilities
//! - Compute elapsed time for each record at report time
//! - Render the human-readable text report
//! - Provide the serializable (JSON) form
//!
//! # Design Decisions
//! - Reports are built from a snapshot copy; no lock is held while rendering
//! - JSON field names and order are fixed: duration, duration_s, method, startTime, url, stack
//! - Duration text follows the compact `1h2m3.5s` / `19ms` notation

use std::fmt::{self, Write as _};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tracker::record::RequestRecord;

/// Report entry for one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestReport {
    /// Elapsed time in nanoseconds.
    pub duration: u64,
    /// Elapsed time as text, e.g. `19ms`.
    #[serde(rename = "duration_s")]
    pub duration_text: String,
    pub method: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    pub url: String,
    /// Formatted stack frames; omitted when no stack was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl RequestReport {
    pub fn from_record(record: &RequestRecord, now: DateTime<Utc>) -> Self {
        let elapsed = record.elapsed(now);
        let stack = if record.stack.is_empty() {
            None
        } else {
            Some(record.stack.iter().map(ToString::to_string).collect())
        };
        Self {
            duration: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            duration_text: format_duration(elapsed),
            method: record.method.to_string(),
            start_time: record.started_at,
            url: record.uri.to_string(),
            stack,
        }
    }
}

/// Point-in-time report of every in-flight request.
///
/// Serializes as a JSON array of [`RequestReport`]; displays as the text report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    pub requests: Vec<RequestReport>,
}

impl Report {
    pub fn new(records: &[RequestRecord], now: DateTime<Utc>) -> Self {
        Self {
            requests: records
                .iter()
                .map(|record| RequestReport::from_record(record, now))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "In-flight HTTP requests:")?;
        for request in &self.requests {
            writeln!(
                f,
                "  servicing {} {} for {}",
                request.method, request.url, request.duration_text
            )?;
            for frame in request.stack.iter().flatten() {
                writeln!(f, "    - {}", frame)?;
            }
        }
        Ok(())
    }
}

/// Format a duration as `72h3m0.5s`, `1.5s`, `19ms`, `2.5µs`, `7ns` or `0s`.
pub fn format_duration(d: Duration) -> String {
    const MICRO: u128 = 1_000;
    const MILLI: u128 = 1_000_000;
    const SECOND: u128 = 1_000_000_000;

    let nanos = d.as_nanos();
    match nanos {
        0 => "0s".to_string(),
        n if n < MICRO => format!("{}ns", n),
        n if n < MILLI => format!("{}µs", decimal(n, MICRO)),
        n if n < SECOND => format!("{}ms", decimal(n, MILLI)),
        n => {
            let total_secs = n / SECOND;
            let hours = total_secs / 3600;
            let minutes = (total_secs % 3600) / 60;
            let seconds = n % (60 * SECOND);

            let mut out = String::new();
            if hours > 0 {
                let _ = write!(out, "{}h", hours);
            }
            if hours > 0 || minutes > 0 {
                let _ = write!(out, "{}m", minutes);
            }
            let _ = write!(out, "{}s", decimal(seconds, SECOND));
            out
        }
    }
}

/// `value / unit` with the fraction trimmed of trailing zeros.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
