//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the tracker from configuration
//! - Install report triggers (signal, interval) writing to stdout
//! - Bind and serve the introspection endpoint
//!
//! # Design Decisions
//! - Fail fast: every fallible step runs before any task is spawned
//! - Background tasks share one shutdown broadcast

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin;
use crate::config::TrackerConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::SignalTrigger;
use crate::reporter::{IntervalTrigger, Reporter};
use crate::tracker::{HttpTracker, TrackerOptions};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to install report signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("failed to bind admin endpoint on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A started tracker and its background tasks.
pub struct Running {
    tracker: HttpTracker,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    admin_addr: Option<SocketAddr>,
}

impl Running {
    pub fn tracker(&self) -> &HttpTracker {
        &self.tracker
    }

    /// Address the admin endpoint is listening on, if enabled.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Stop every trigger and the admin endpoint, then wait for them to exit.
    ///
    /// The tracker itself keeps working for requests still holding it.
    pub async fn shutdown(self) {
        tracing::info!(tasks = self.tasks.len(), "Stopping tracker background tasks");
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
    }
}

/// Build a tracker and start its report triggers and admin endpoint.
pub async fn start(config: &TrackerConfig) -> Result<Running, StartupError> {
    let tracker = HttpTracker::new(TrackerOptions::from(&config.tracker));

    let signal_trigger = SignalTrigger::new(config.report.signal).map_err(StartupError::Signal)?;
    let admin_listener = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address)
            .await
            .map_err(|source| StartupError::Bind {
                address: config.admin.bind_address.clone(),
                source,
            })?;
        Some(listener)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let reporter = Reporter::new(tracker.clone(), config.report.format);
    let mut tasks = Vec::new();

    if let Some(trigger) = signal_trigger {
        tracing::info!(signal = ?config.report.signal, "Report signal handler installed");
        let reporter = reporter.clone();
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            reporter.run(trigger, tokio::io::stdout(), rx).await;
        }));
    }

    if config.report.interval_secs > 0 {
        tracing::info!(interval_secs = config.report.interval_secs, "Periodic reports enabled");
        let trigger = IntervalTrigger::new(Duration::from_secs(config.report.interval_secs));
        let reporter = reporter.clone();
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            reporter.run(trigger, tokio::io::stdout(), rx).await;
        }));
    }

    let mut admin_addr = None;
    if let Some(listener) = admin_listener {
        admin_addr = listener.local_addr().ok();
        let tracker = tracker.clone();
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, tracker, rx).await {
                tracing::error!(error = %e, "Admin endpoint failed");
            }
        }));
    }

    tracing::info!(
        track_stacks = tracker.track_stacks(),
        admin = ?admin_addr,
        "HTTP tracker started"
    );

    Ok(Running {
        tracker,
        shutdown,
        tasks,
        admin_addr,
    })
}
