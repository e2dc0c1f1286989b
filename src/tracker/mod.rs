//! In-flight HTTP client request tracking.
//!
//! # Data Flow
//! ```text
//! caller
//!     → service.rs (TrackedService::call registers the request)
//!     → registry.rs (id allocation, record + optional stack.rs capture)
//!     → inner transport (hyper client, any tower Service)
//!     → success: body.rs wraps the response body in TrackedBody
//!       failure: record released immediately
//!     → caller drops / closes the body → record released
//!
//! On demand:
//!     registry snapshot → report.rs (text or JSON) → sink
//! ```
//!
//! # Design Decisions
//! - One mutex around the registry map; nothing slow runs under it
//! - Release is tied to ownership: a `Registration` guard deregisters on drop
//! - No global transport substitution: callers wrap the service they hold

pub mod body;
pub mod clock;
pub mod record;
pub mod registry;
pub mod report;
pub mod service;
pub mod stack;

use std::sync::Arc;

use crate::config::TrackerSettings;

pub use body::TrackedBody;
pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{RequestId, RequestRecord};
pub use registry::{Registration, Registry};
pub use report::{format_duration, Report, RequestReport};
pub use service::{ResponseFuture, TrackedService, TrackerLayer};
pub use stack::StackFrame;

/// Options controlling what the tracker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Record the call stack that issued each request.
    pub track_stacks: bool,
    /// Upper bound on recorded frames per request.
    pub max_stack_frames: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            track_stacks: false,
            max_stack_frames: stack::MAX_STACK_FRAMES,
        }
    }
}

impl From<&TrackerSettings> for TrackerOptions {
    fn from(settings: &TrackerSettings) -> Self {
        Self {
            track_stacks: settings.track_stacks,
            max_stack_frames: settings.max_stack_frames,
        }
    }
}

/// Handle to a request tracker.
///
/// Cheap to clone; every clone, layer and wrapped service shares the same
/// registry.
///
/// ```no_run
/// # use http_tracker::tracker::{HttpTracker, TrackerOptions};
/// # use hyper_util::{client::legacy::Client, rt::TokioExecutor};
/// # use http_body_util::Empty;
/// # use hyper::body::Bytes;
/// let tracker = HttpTracker::new(TrackerOptions::default());
/// let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
/// let client = tracker.wrap(client);
/// ```
#[derive(Clone)]
pub struct HttpTracker {
    registry: Arc<Registry>,
}

impl HttpTracker {
    /// Create a tracker that timestamps records with the system clock.
    pub fn new(options: TrackerOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Create a tracker with an explicit time source.
    pub fn with_clock(options: TrackerOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(Registry::new(options, clock)),
        }
    }

    /// A layer wrapping services with this tracker.
    pub fn layer(&self) -> TrackerLayer {
        TrackerLayer::new(Arc::clone(&self.registry))
    }

    /// Wrap a transport with this tracker.
    pub fn wrap<S>(&self, inner: S) -> TrackedService<S> {
        TrackedService::new(inner, Arc::clone(&self.registry))
    }

    /// Whether call stacks are being recorded.
    pub fn track_stacks(&self) -> bool {
        self.registry.options().track_stacks
    }

    /// Number of requests currently in flight.
    pub fn count(&self) -> usize {
        self.registry.count()
    }

    /// Copy of every in-flight record, ordered by id.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.registry.snapshot()
    }

    /// Snapshot the registry and compute elapsed times as of now.
    pub fn report(&self) -> Report {
        let records = self.registry.snapshot();
        Report::new(&records, self.registry.clock().now())
    }

    /// JSON rendering of the current report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.report())
    }

    /// The shared registry, for registering requests that bypass the service wrapper.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl std::fmt::Debug for HttpTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTracker")
            .field("in_flight", &self.count())
            .field("options", self.registry.options())
            .finish()
    }
}
