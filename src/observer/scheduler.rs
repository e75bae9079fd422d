use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connections::{ConnectionRegistry, SharedHistory};
use super::lock;
use crate::config::ObserverConfig;
use crate::protocol::Request;
use crate::transport::{PageConnection, PageId, TransportError};

/// Outcome counts of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub updated: usize,
    pub stale: usize,
    pub disconnected: usize,
    /// Completions for pages that went away while their request was in flight.
    pub dropped: usize,
}

impl TickSummary {
    pub fn polled(&self) -> usize {
        self.updated + self.stale + self.disconnected + self.dropped
    }
}

/// Polls every tracked page, waits for all replies, then sleeps for the poll
/// interval before the next cycle.
#[derive(Debug)]
pub struct PollScheduler {
    connections: Arc<Mutex<ConnectionRegistry>>,
    registered: Arc<Notify>,
    interval: Duration,
    request_timeout: Option<Duration>,
    epoch: Instant,
}

impl PollScheduler {
    pub(crate) fn new(
        connections: Arc<Mutex<ConnectionRegistry>>,
        registered: Arc<Notify>,
        config: &ObserverConfig,
    ) -> Self {
        Self {
            connections,
            registered,
            interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since this scheduler was created.
    pub fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// One poll cycle: a `getVariables` request to every tracked page in
    /// parallel. Returns once every request has completed or timed out.
    pub async fn tick(&self) -> TickSummary {
        let tracked = lock(&self.connections).tracked();
        let mut summary = TickSummary::default();
        if tracked.is_empty() {
            return summary;
        }

        let mut updates = JoinSet::new();
        for (page, connection, history) in tracked {
            let request_timeout = self.request_timeout;
            let epoch = self.epoch;
            updates.spawn(async move {
                let result = fetch(&connection, request_timeout).await;
                let timestamp = epoch.elapsed().as_millis() as u64;
                (page, history, timestamp, result)
            });
        }

        while let Some(joined) = updates.join_next().await {
            let (page, history, timestamp, result) = match joined {
                Ok(completion) => completion,
                Err(e) => {
                    warn!("poll task failed: {}", e);
                    continue;
                }
            };
            self.complete(page, &history, timestamp, result, &mut summary);
        }

        debug!(
            updated = summary.updated,
            stale = summary.stale,
            disconnected = summary.disconnected,
            dropped = summary.dropped,
            "poll cycle complete"
        );
        summary
    }

    fn complete(
        &self,
        page: PageId,
        history: &SharedHistory,
        timestamp: u64,
        result: Result<String, TransportError>,
        summary: &mut TickSummary,
    ) {
        let mut connections = lock(&self.connections);
        if !connections.is_current(page, history) {
            summary.dropped += 1;
            return;
        }

        let outcome = result.and_then(|reply| lock(history).update(timestamp, &reply));
        match outcome {
            Ok(()) => summary.updated += 1,
            Err(TransportError::Disconnected) => {
                connections.unregister(page);
                info!(%page, "page disconnected during poll");
                summary.disconnected += 1;
            }
            Err(e) => {
                warn!(%page, "poll failed: {}", e);
                lock(history).mark_stale();
                summary.stale += 1;
            }
        }
    }

    /// Runs poll cycles until `shutdown` is cancelled. With nothing to poll it
    /// waits for the next page to connect instead of sleeping an interval.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "poll scheduler started");
        loop {
            let idle = lock(&self.connections).is_empty();
            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.registered.notified() => continue,
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.tick() => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }
        info!("poll scheduler stopped");
    }
}

async fn fetch(connection: &PageConnection, limit: Option<Duration>) -> Result<String, TransportError> {
    let request = connection.request(Request::GetVariables);
    match limit {
        Some(limit) => timeout(limit, request)
            .await
            .unwrap_or(Err(TransportError::Timeout(limit))),
        None => request.await,
    }
}
