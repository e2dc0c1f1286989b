//! Call stack capture for tracked requests.
#![cfg(feature = "stacks")]

use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Request, Response};
use tower::{service_fn, ServiceExt};

use http_tracker::{HttpTracker, TrackedBody, TrackerOptions};

async fn issue_tracked_request(tracker: &HttpTracker) -> Response<TrackedBody<Empty<Bytes>>> {
    let svc = tracker.wrap(service_fn(|_req: Request<Empty<Bytes>>| async {
        Ok::<_, std::io::Error>(Response::new(Empty::<Bytes>::new()))
    }));
    svc.oneshot(Request::get("http://www.spy.net/").body(Empty::new()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn stack_starts_outside_the_tracker() {
    let tracker = HttpTracker::new(TrackerOptions {
        track_stacks: true,
        ..TrackerOptions::default()
    });
    let _response = issue_tracked_request(&tracker).await;

    let records = tracker.snapshot();
    let stack = &records[0].stack;
    assert!(!stack.is_empty());
    assert!(stack.len() <= 64);
    assert!(stack
        .iter()
        .all(|frame| !frame.function.contains("http_tracker::tracker::registry")));
    assert!(stack
        .iter()
        .any(|frame| frame.function.contains("issue_tracked_request")));

    let json = tracker.to_json().unwrap();
    assert!(json.contains("\"stack\":["));
}

#[tokio::test]
async fn stack_is_bounded() {
    let tracker = HttpTracker::new(TrackerOptions {
        track_stacks: true,
        max_stack_frames: 3,
    });
    let _response = issue_tracked_request(&tracker).await;
    assert!(tracker.snapshot()[0].stack.len() <= 3);
}

#[tokio::test]
async fn no_stack_without_tracking() {
    let tracker = HttpTracker::new(TrackerOptions::default());
    let _response = issue_tracked_request(&tracker).await;
    assert!(tracker.snapshot()[0].stack.is_empty());
    assert!(!tracker.to_json().unwrap().contains("stack"));
}
