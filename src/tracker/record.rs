//! Request records held by the registry.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{Method, Uri};

use crate::tracker::stack::StackFrame;

/// Identifier of an in-flight request.
///
/// Unique among live records only; ids may be handed out again once released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Snapshot of one in-flight call.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub id: RequestId,
    pub started_at: DateTime<Utc>,
    pub method: Method,
    pub uri: Uri,
    /// Empty unless stack tracking is enabled.
    pub stack: Vec<StackFrame>,
}

impl RequestRecord {
    /// Time spent in flight as of `now`. Clock skew backwards yields zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }
}
