//! Report loop driven by external triggers.
//!
//! # Data Flow
//! ```text
//! trigger (signal / interval / channel)
//!     → Reporter::run wakes up
//!     → tracker snapshot (registry lock held for the copy only)
//!     → render text or JSON
//!     → write to sink (stdout, file, socket)
//! ```
//!
//! # Design Decisions
//! - One task per trigger; triggers never share a loop
//! - Sink write failures are logged and the loop keeps going
//! - The loop ends when the trigger is exhausted or shutdown is broadcast

pub mod trigger;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::tracker::HttpTracker;

pub use trigger::{IntervalTrigger, ReportTrigger};

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Writes tracker reports to a sink whenever its trigger fires.
#[derive(Debug, Clone)]
pub struct Reporter {
    tracker: HttpTracker,
    format: ReportFormat,
}

impl Reporter {
    pub fn new(tracker: HttpTracker, format: ReportFormat) -> Self {
        Self { tracker, format }
    }

    /// Render the current state of the tracker.
    pub fn render(&self) -> String {
        let report = self.tracker.report();
        match self.format {
            ReportFormat::Text => report.to_string(),
            ReportFormat::Json => match serde_json::to_string(&report) {
                Ok(mut json) => {
                    json.push('\n');
                    json
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize report");
                    String::new()
                }
            },
        }
    }

    /// Run until the trigger is exhausted or shutdown fires. Returns the sink.
    pub async fn run<T, W>(
        self,
        mut trigger: T,
        mut sink: W,
        mut shutdown: broadcast::Receiver<()>,
    ) -> W
    where
        T: ReportTrigger,
        W: AsyncWrite + Unpin + Send,
    {
        tracing::debug!(format = ?self.format, "Reporter started");
        loop {
            tokio::select! {
                fired = trigger.fired() => {
                    if !fired {
                        tracing::debug!("Report trigger exhausted");
                        break;
                    }
                    let rendered = self.render();
                    if let Err(e) = write_report(&mut sink, &rendered).await {
                        tracing::warn!(error = %e, "Failed to write report");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Reporter received shutdown signal");
                    break;
                }
            }
        }
        sink
    }
}

async fn write_report<W: AsyncWrite + Unpin>(sink: &mut W, rendered: &str) -> std::io::Result<()> {
    sink.write_all(rendered.as_bytes()).await?;
    sink.flush().await
}
