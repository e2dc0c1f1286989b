//! HTTP call tracker demo client.
//!
//! # Architecture Overview
//!
//! ```text
//!    caller tasks                                       remote servers
//!    ────────────┐                                     ┌──────────────
//!                ▼                                     │
//!        ┌───────────────┐    ┌────────────────┐       │
//!        │ TrackedService│───▶│ hyper client   │───────┘
//!        │  (register)   │◀───│ (any Service)  │
//!        └──────┬────────┘    └────────────────┘
//!               │ TrackedBody (release on close)
//!               ▼
//!        ┌───────────────┐    ┌────────────────┐
//!        │   Registry    │◀───│   Reporters    │◀── SIGUSR1 / interval
//!        └───────────────┘    │ admin endpoint │◀── GET /debug/httpclients
//!                             └────────────────┘
//! ```
//!
//! Issues GET requests through a tracked client so in-flight reports can be
//! requested while they run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use http_tracker::config::{load_config, TrackerConfig};
use http_tracker::lifecycle::{self, signals};
use http_tracker::observability::{logging, metrics};
use http_tracker::HttpError;

#[derive(Parser)]
#[command(name = "http-tracker")]
#[command(about = "Issue HTTP requests through an in-flight tracker", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record the call stack of each request.
    #[arg(long)]
    track_stacks: bool,

    /// Maximum concurrent requests.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Keep each response body open this long before reading it.
    #[arg(long, default_value_t = 0)]
    hold_secs: u64,

    /// Keep running after the requests finish until Ctrl+C.
    #[arg(long)]
    linger: bool,

    /// URLs to fetch.
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    if cli.track_stacks {
        config.tracker.track_stacks = true;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!("http-tracker v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = lifecycle::start(&config).await?;
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
    let client = running.tracker().wrap(client);

    let permits = Arc::new(Semaphore::new(cli.concurrency.max(1)));
    let hold = Duration::from_secs(cli.hold_secs);
    let mut tasks = Vec::new();
    for url in cli.urls {
        let client = client.clone();
        let permits = Arc::clone(&permits);
        tasks.push(tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = fetch(client, &url, hold).await {
                tracing::warn!(url = %url, error = %e, "Request failed");
            }
        }));
    }
    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Request task ended abnormally");
        }
    }

    if cli.linger {
        tracing::info!("Requests finished; waiting for Ctrl+C");
        signals::ctrl_c().await;
    }

    running.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn fetch<S>(client: S, url: &str, hold: Duration) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: tower::Service<
        Request<Empty<Bytes>>,
        Response = hyper::Response<http_tracker::TrackedBody<hyper::body::Incoming>>,
    >,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let request = Request::get(url).body(Empty::new())?;
    let response = client.oneshot(request).await?;
    let status = response.status();

    if !hold.is_zero() {
        tokio::time::sleep(hold).await;
    }

    if !status.is_success() {
        return Err(HttpError::from_response(response).await.into());
    }

    let bytes = response
        .into_body()
        .copy_to(&mut tokio::io::sink())
        .await?;
    tracing::info!(url = %url, status = %status, bytes, "Request complete");
    Ok(())
}
