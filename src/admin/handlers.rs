use axum::{extract::State, Json};
use serde::Serialize;

use crate::tracker::{HttpTracker, Report};

#[derive(Debug, Serialize)]
pub struct TrackerStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub inflight: usize,
    pub track_stacks: bool,
}

pub async fn get_status(State(tracker): State<HttpTracker>) -> Json<TrackerStatus> {
    Json(TrackerStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "tracking",
        inflight: tracker.count(),
        track_stacks: tracker.track_stacks(),
    })
}

pub async fn get_inflight(State(tracker): State<HttpTracker>) -> Json<Report> {
    Json(tracker.report())
}

pub async fn get_inflight_text(State(tracker): State<HttpTracker>) -> String {
    tracker.report().to_string()
}
