//! Sources of "report now" events.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

/// An asynchronous source of discrete report events.
pub trait ReportTrigger: Send {
    /// Wait for the next event. `false` means the source is exhausted.
    fn fired(&mut self) -> impl Future<Output = bool> + Send;
}

/// Manual triggering through a channel; exhausted when every sender is gone.
impl ReportTrigger for mpsc::Receiver<()> {
    async fn fired(&mut self) -> bool {
        self.recv().await.is_some()
    }
}

impl ReportTrigger for mpsc::UnboundedReceiver<()> {
    async fn fired(&mut self) -> bool {
        self.recv().await.is_some()
    }
}

/// Fires on a fixed period. Never exhausted.
#[derive(Debug)]
pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    /// The first event fires one `period` from now.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl ReportTrigger for IntervalTrigger {
    async fn fired(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}
