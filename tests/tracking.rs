//! End-to-end tracking through a real HTTP client.

use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::Request;
use serde_json::Value;
use tower::ServiceExt;

use http_tracker::config::{ReportSignal, TrackerConfig};
use http_tracker::lifecycle;
use http_tracker::{is_http_status, HttpError, HttpTracker, TrackerOptions};

mod common;

fn get(addr: std::net::SocketAddr, path: &str) -> Request<Empty<Bytes>> {
    Request::get(format!("http://{}{}", addr, path))
        .body(Empty::new())
        .unwrap()
}

#[tokio::test]
async fn test_record_held_until_body_closed() {
    let backend = common::start_mock_backend(200, "Hello from backend").await;
    let tracker = HttpTracker::new(TrackerOptions::default());
    let client = tracker.wrap(common::client());

    let response = client.clone().oneshot(get(backend, "/hello")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(tracker.count(), 1);

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot[0].uri.to_string(), format!("http://{}/hello", backend));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Hello from backend");
    assert_eq!(tracker.count(), 0);
}

#[tokio::test]
async fn test_connection_failure_releases_record() {
    let addr = common::closed_port().await;
    let tracker = HttpTracker::new(TrackerOptions::default());
    let client = tracker.wrap(common::client());

    let result = client.oneshot(get(addr, "/")).await;
    assert!(result.is_err());
    assert_eq!(tracker.count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let backend = common::start_mock_backend(200, "ok").await;
    let tracker = HttpTracker::new(TrackerOptions::default());
    let client = tracker.wrap(common::client());

    let mut held = Vec::new();
    for i in 0..10 {
        let response = client
            .clone()
            .oneshot(get(backend, &format!("/item/{}", i)))
            .await
            .unwrap();
        held.push(response);
    }
    assert_eq!(tracker.count(), 10);

    let ids: std::collections::HashSet<_> = tracker.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 10);

    held.truncate(4);
    assert_eq!(tracker.count(), 4);
    drop(held);
    assert_eq!(tracker.count(), 0);
}

#[tokio::test]
async fn test_http_error_from_tracked_response() {
    let backend = common::start_mock_backend(404, "omg, not found").await;
    let tracker = HttpTracker::new(TrackerOptions::default());
    let client = tracker.wrap(common::client());

    let response = client.oneshot(get(backend, "/missing")).await.unwrap();
    let err = HttpError::from_response(response).await;

    assert_eq!(err.to_string(), "HTTP Error 404 Not Found - omg, not found");
    assert!(is_http_status(&err, 404));
    assert!(!is_http_status(&err, 500));
    assert_eq!(tracker.count(), 0);
}

#[tokio::test]
async fn test_admin_endpoint_reports_inflight() {
    let backend = common::start_mock_backend(200, "slow body").await;

    let mut config = TrackerConfig::default();
    config.report.signal = ReportSignal::None;
    config.admin.enabled = true;
    config.admin.bind_address = "127.0.0.1:0".to_string();
    let running = lifecycle::start(&config).await.unwrap();
    let admin = running.admin_addr().unwrap();
    let client = running.tracker().wrap(common::client());

    let response = client.oneshot(get(backend, "/report-me")).await.unwrap();

    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let inflight: Value = http
        .get(format!("http://{}/debug/httpclients", admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = inflight.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["method"], "GET");
    assert_eq!(entries[0]["url"], format!("http://{}/report-me", backend));
    assert!(entries[0]["duration"].as_u64().is_some());
    assert!(entries[0].get("stack").is_none());

    let text = http
        .get(format!("http://{}/debug/httpclients/text", admin))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.starts_with("In-flight HTTP requests:\n  servicing GET http://"));

    drop(response);

    let status: Value = http
        .get(format!("http://{}/debug/status", admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["inflight"], 0);

    tokio::time::timeout(Duration::from_secs(5), running.shutdown())
        .await
        .unwrap();
}
