//! Registry of in-flight requests.
//!
//! # Responsibilities
//! - Allocate request ids unique among live records
//! - Store and release request records
//! - Provide point-in-time counts and snapshots
//!
//! # Design Decisions
//! - Single mutex; critical sections are O(1) map operations
//! - Stack capture, logging and metrics happen outside the lock
//! - Releasing an absent id is a no-op
//! - Poisoned locks are recovered: every critical section leaves the map consistent

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use http::{Method, Uri};

use crate::observability::metrics;
use crate::tracker::clock::Clock;
use crate::tracker::record::{RequestId, RequestRecord};
use crate::tracker::stack;
use crate::tracker::TrackerOptions;

#[derive(Default)]
struct Inflight {
    records: HashMap<u64, RequestRecord>,
    next_id: u64,
}

/// Concurrency-safe map from request id to record.
pub struct Registry {
    inflight: Mutex<Inflight>,
    options: TrackerOptions,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(options: TrackerOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            inflight: Mutex::new(Inflight::default()),
            options,
            clock,
        }
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, Inflight> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a new in-flight request and return its id.
    pub fn register(&self, method: &Method, uri: &Uri) -> RequestId {
        let stack = if self.options.track_stacks {
            stack::capture(self.options.max_stack_frames)
        } else {
            Vec::new()
        };
        let started_at = self.clock.now();

        let id = {
            let mut inflight = self.lock();
            // Probe forward from the counter, skipping ids still in use.
            let mut id = inflight.next_id;
            while inflight.records.contains_key(&id) {
                id = id.wrapping_add(1);
            }
            inflight.next_id = id.wrapping_add(1);
            inflight.records.insert(
                id,
                RequestRecord {
                    id: RequestId::from(id),
                    started_at,
                    method: method.clone(),
                    uri: uri.clone(),
                    stack,
                },
            );
            RequestId::from(id)
        };

        metrics::request_registered();
        tracing::trace!(request_id = %id, method = %method, uri = %uri, "Request registered");
        id
    }

    /// Release a record. Returns false if the id was not registered.
    pub fn unregister(&self, id: RequestId) -> bool {
        let removed = self.lock().records.remove(&id.as_u64()).is_some();

        if removed {
            metrics::request_released();
            tracing::trace!(request_id = %id, "Request released");
        }
        removed
    }

    /// Number of live records.
    pub fn count(&self) -> usize {
        self.lock().records.len()
    }

    /// Copy of every live record, ordered by id.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        let mut records: Vec<RequestRecord> = self.lock().records.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Register and return a guard that releases the record when dropped.
    pub fn track(self: &Arc<Self>, method: &Method, uri: &Uri) -> Registration {
        Registration {
            id: self.register(method, uri),
            registry: Arc::clone(self),
        }
    }
}

/// Guard over one registration. Releases the record on drop.
pub struct Registration {
    id: RequestId,
    registry: Arc<Registry>,
}

impl Registration {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Release the record now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::clock::SystemClock;
    use ::metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn registry(track_stacks: bool) -> Arc<Registry> {
        Arc::new(Registry::new(
            TrackerOptions {
                track_stacks,
                ..TrackerOptions::default()
            },
            Arc::new(SystemClock),
        ))
    }

    fn get() -> (Method, Uri) {
        (Method::GET, Uri::from_static("http://www.spy.net/"))
    }

    #[test]
    fn test_registration() {
        let registry = registry(true);
        let one = registry.register(&Method::GET, &Uri::from_static("http://x/"));
        let two = registry.register(&Method::GET, &Uri::from_static("http://y/"));
        assert_ne!(one, two);
        assert_eq!(registry.count(), 2);

        assert!(registry.unregister(one));
        assert_eq!(registry.count(), 1);

        assert!(!registry.unregister(one));
        assert_eq!(registry.count(), 1);

        assert!(registry.unregister(two));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_id_collision_skips_live_ids() {
        let registry = registry(false);
        let (method, uri) = get();
        {
            let mut inflight = registry.lock();
            for id in 0..4u64 {
                inflight.records.insert(
                    id,
                    RequestRecord {
                        id: RequestId::from(id),
                        started_at: chrono::Utc::now(),
                        method: method.clone(),
                        uri: uri.clone(),
                        stack: Vec::new(),
                    },
                );
            }
        }

        let id = registry.register(&method, &uri);
        assert_eq!(id.as_u64(), 4);
    }

    #[test]
    fn counter_does_not_reuse_lower_ids() {
        let registry = registry(false);
        let (method, uri) = get();
        let first = registry.register(&method, &uri);
        registry.unregister(first);
        let second = registry.register(&method, &uri);
        assert_eq!(first.as_u64(), 0);
        assert_eq!(second.as_u64(), 1);
    }

    #[test]
    fn counter_wraps_around() {
        let registry = registry(false);
        let (method, uri) = get();
        registry.lock().next_id = u64::MAX;
        let last = registry.register(&method, &uri);
        let wrapped = registry.register(&method, &uri);
        assert_eq!(last.as_u64(), u64::MAX);
        assert_eq!(wrapped.as_u64(), 0);
    }

    #[test]
    fn concurrent_registrations_are_distinct() {
        let registry = registry(false);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let (method, uri) = get();
                    (0..100)
                        .map(|_| registry.register(&method, &uri))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(registry.count(), 800);
    }

    #[test]
    fn concurrent_release_of_same_id() {
        let registry = registry(false);
        let (method, uri) = get();
        let id = registry.register(&method, &uri);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.unregister(id))
            })
            .collect();
        let released = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|removed| *removed)
            .count();

        assert_eq!(released, 1);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn snapshot_is_a_copy_ordered_by_id() {
        let registry = registry(false);
        let a = registry.register(&Method::GET, &Uri::from_static("http://x/"));
        let b = registry.register(&Method::POST, &Uri::from_static("http://y/"));

        let snapshot = registry.snapshot();
        registry.unregister(a);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, a);
        assert_eq!(snapshot[1].id, b);
        assert_eq!(snapshot[1].method, Method::POST);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn stacks_only_when_enabled() {
        let registry = registry(false);
        let (method, uri) = get();
        registry.register(&method, &uri);
        assert!(registry.snapshot()[0].stack.is_empty());
    }

    /// Records the in-flight gauge into a shared atomic; every other metric is dropped.
    struct InflightRecorder(Arc<AtomicU64>);

    impl Recorder for InflightRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            if key.name() == metrics::INFLIGHT_REQUESTS {
                Gauge::from_arc(Arc::clone(&self.0))
            } else {
                Gauge::noop()
            }
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn inflight_gauge_sums_over_registries() {
        let gauge = Arc::new(AtomicU64::new(0));
        let recorder = InflightRecorder(Arc::clone(&gauge));
        let (method, uri) = get();
        let first = registry(false);
        let second = registry(false);

        ::metrics::with_local_recorder(&recorder, || {
            first.register(&method, &uri);
            first.register(&method, &uri);
            let id = second.register(&method, &uri);
            second.unregister(id);
            // A repeated release must not move the gauge.
            second.unregister(id);
        });

        let published = f64::from_bits(gauge.load(Ordering::Acquire));
        assert_eq!(published, (first.count() + second.count()) as f64);
        assert_eq!(published, 2.0);
    }

    #[test]
    fn registration_guard_releases_on_drop() {
        let registry = registry(false);
        let (method, uri) = get();
        let guard = registry.track(&method, &uri);
        assert_eq!(registry.count(), 1);
        guard.release();
        assert_eq!(registry.count(), 0);
    }
}
