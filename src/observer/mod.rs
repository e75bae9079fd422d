//! The observer session: tracks connected pages, polls them, and answers
//! display queries from the buffered history.

pub mod connections;
pub mod history;
pub mod scheduler;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use connections::{ConnectionRegistry, SharedHistory};
pub use history::{HistoryEntry, SampleHistory};
pub use scheduler::{PollScheduler, TickSummary};

use crate::config::ObserverConfig;
use crate::query::{self, FilterTable, PageReport};
use crate::transport::{PageConnection, PageId};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Observer {
    connections: Arc<Mutex<ConnectionRegistry>>,
    scheduler: PollScheduler,
    registered: Arc<Notify>,
    filters: FilterTable,
}

impl Observer {
    pub fn new(config: ObserverConfig) -> Self {
        Self::with_filters(config, FilterTable::standard())
    }

    pub fn with_filters(config: ObserverConfig, filters: FilterTable) -> Self {
        let connections = Arc::new(Mutex::new(ConnectionRegistry::new(config.history_capacity)));
        let registered = Arc::new(Notify::new());
        let scheduler = PollScheduler::new(Arc::clone(&connections), Arc::clone(&registered), &config);
        Self {
            connections,
            scheduler,
            registered,
            filters,
        }
    }

    /// Starts tracking a page with a fresh history, replacing whatever was
    /// tracked under the same identity. The page is dropped again as soon as
    /// its connection closes. Must be called inside a Tokio runtime.
    pub fn connect(&self, connection: PageConnection) -> SharedHistory {
        let page = connection.page();
        let (history, released) = lock(&self.connections).register(page, connection.clone());
        info!(%page, "page connected");
        self.registered.notify_one();

        let connections = Arc::clone(&self.connections);
        let watched = Arc::clone(&history);
        tokio::spawn(async move {
            tokio::select! {
                // Disconnected, replaced, or the observer went away.
                _ = released.cancelled() => {}
                _ = connection.closed() => {
                    let mut connections = lock(&connections);
                    if connections.is_current(page, &watched) {
                        connections.unregister(page);
                        info!(%page, "page disconnected");
                    }
                }
            }
        });

        history
    }

    pub fn disconnect(&self, page: PageId) -> bool {
        let removed = lock(&self.connections).unregister(page);
        if removed {
            info!(%page, "page released");
        }
        removed
    }

    pub fn get(&self, page: PageId) -> Option<SharedHistory> {
        lock(&self.connections).get(page)
    }

    pub fn is_tracked(&self, page: PageId) -> bool {
        self.get(page).is_some()
    }

    pub fn pages(&self) -> Vec<PageId> {
        lock(&self.connections).ids()
    }

    /// The buffered `{timestamp, snapshot}` entries of a page, oldest first.
    pub fn history(&self, page: PageId) -> Option<Vec<HistoryEntry>> {
        let history = self.get(page)?;
        let entries = lock(&history).to_vec();
        Some(entries)
    }

    /// Reduces every variable of a page to its displayed value. `None` when
    /// the page isn't tracked.
    pub fn report(&self, page: PageId) -> Option<PageReport> {
        let history = self.get(page)?;
        let history = lock(&history);
        Some(PageReport {
            page,
            samples: history.len(),
            stale: history.is_stale(),
            variables: query::reduce(history.entries(), &self.filters),
        })
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub async fn tick(&self) -> TickSummary {
        self.scheduler.tick().await
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        self.scheduler.run(shutdown).await
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        lock(&self.connections).clear();
    }
}
