//! OS signal handling.
//!
//! # Responsibilities
//! - Register the configured report signal
//! - Expose it as a report trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Dropping the trigger releases the subscription

use std::io;

use crate::config::ReportSignal;
use crate::reporter::ReportTrigger;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Raw number of SIGINFO on BSD and macOS.
#[cfg(unix)]
const SIGINFO: i32 = 29;

/// Report trigger backed by a unix signal.
#[cfg(unix)]
#[derive(Debug)]
pub struct SignalTrigger {
    signal: Signal,
}

#[cfg(unix)]
impl SignalTrigger {
    /// Subscribe to `kind`. Returns `Ok(None)` for [`ReportSignal::None`].
    pub fn new(kind: ReportSignal) -> io::Result<Option<Self>> {
        let kind = match kind {
            ReportSignal::None => return Ok(None),
            ReportSignal::Usr1 => SignalKind::user_defined1(),
            ReportSignal::Usr2 => SignalKind::user_defined2(),
            ReportSignal::Info => SignalKind::from_raw(SIGINFO),
        };
        Ok(Some(Self {
            signal: signal(kind)?,
        }))
    }
}

#[cfg(unix)]
impl ReportTrigger for SignalTrigger {
    async fn fired(&mut self) -> bool {
        self.signal.recv().await.is_some()
    }
}

/// Signals are not available; no trigger is installed.
#[cfg(not(unix))]
#[derive(Debug)]
pub struct SignalTrigger;

#[cfg(not(unix))]
impl SignalTrigger {
    pub fn new(kind: ReportSignal) -> io::Result<Option<Self>> {
        if kind != ReportSignal::None {
            tracing::warn!(signal = ?kind, "Report signals are not supported on this platform");
        }
        Ok(None)
    }
}

#[cfg(not(unix))]
impl ReportTrigger for SignalTrigger {
    async fn fired(&mut self) -> bool {
        false
    }
}

/// Wait for Ctrl+C.
pub async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_installs_nothing() {
        assert!(SignalTrigger::new(ReportSignal::None).unwrap().is_none());
    }

    #[tokio::test]
    async fn user_signal_installs() {
        assert!(SignalTrigger::new(ReportSignal::Usr2).unwrap().is_some());
    }
}
