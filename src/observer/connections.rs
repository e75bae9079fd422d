use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::history::SampleHistory;
use crate::transport::{PageConnection, PageId};

pub type SharedHistory = Arc<Mutex<SampleHistory>>;

#[derive(Debug)]
struct Tracked {
    connection: PageConnection,
    history: SharedHistory,
    /// Cancelled once the entry is removed or replaced, so anything still
    /// holding a clone of `connection` lets go of it.
    released: CancellationToken,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.released.cancel();
    }
}

/// Live connections by page identity, each with its own history. A page is
/// tracked at most once; registering it again starts a fresh history.
#[derive(Debug)]
pub struct ConnectionRegistry {
    capacity: usize,
    pages: HashMap<PageId, Tracked>,
}

impl ConnectionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pages: HashMap::new(),
        }
    }

    /// Tracks `connection` under `page`, releasing any entry it replaces.
    /// The returned token is cancelled when this entry goes away.
    pub fn register(
        &mut self,
        page: PageId,
        connection: PageConnection,
    ) -> (SharedHistory, CancellationToken) {
        let history = Arc::new(Mutex::new(SampleHistory::new(page, self.capacity)));
        let released = CancellationToken::new();
        self.pages.insert(
            page,
            Tracked {
                connection,
                history: Arc::clone(&history),
                released: released.clone(),
            },
        );
        (history, released)
    }

    /// Drops every tracked page.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Returns whether the page was tracked.
    pub fn unregister(&mut self, page: PageId) -> bool {
        self.pages.remove(&page).is_some()
    }

    pub fn get(&self, page: PageId) -> Option<SharedHistory> {
        self.pages.get(&page).map(|tracked| Arc::clone(&tracked.history))
    }

    pub fn connection(&self, page: PageId) -> Option<PageConnection> {
        self.pages.get(&page).map(|tracked| tracked.connection.clone())
    }

    /// Whether `history` is still the one tracked for `page`, i.e. the page
    /// hasn't disconnected or re-registered since it was handed out.
    pub fn is_current(&self, page: PageId, history: &SharedHistory) -> bool {
        self.pages
            .get(&page)
            .is_some_and(|tracked| Arc::ptr_eq(&tracked.history, history))
    }

    pub fn ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.pages.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub(crate) fn tracked(&self) -> Vec<(PageId, PageConnection, SharedHistory)> {
        self.pages
            .iter()
            .map(|(page, tracked)| (*page, tracked.connection.clone(), Arc::clone(&tracked.history)))
            .collect()
    }
}
