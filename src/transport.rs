//! In-process stand-in for the page <-> observer channel.
//!
//! A connection carries an opaque request string to the page and brings back
//! its JSON reply. Only one request is ever in flight per connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

use crate::protocol::Request;

const CHANNEL_CAPACITY: usize = 8;

/// Opaque identity of an instrumented page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0.simple())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("page disconnected")]
    Disconnected,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("undecodable reply: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One request travelling to the page, with the slot its reply goes into.
#[derive(Debug)]
pub struct Envelope {
    request: String,
    reply: oneshot::Sender<String>,
}

impl Envelope {
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Delivers the reply. A requester that gave up in the meantime is ignored.
    pub fn respond(self, reply: String) {
        let _ = self.reply.send(reply);
    }
}

/// Observer-side end of a page channel.
#[derive(Debug, Clone)]
pub struct PageConnection {
    page: PageId,
    tx: mpsc::Sender<Envelope>,
    in_flight: Arc<Mutex<()>>,
}

impl PageConnection {
    pub fn page(&self) -> PageId {
        self.page
    }

    /// Sends `request` and waits for the page's reply. A second caller waits
    /// until the first request has completed or been abandoned.
    pub async fn send(&self, request: &str) -> Result<String, TransportError> {
        let _slot = self.in_flight.lock().await;
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request: request.to_string(),
                reply,
            })
            .await
            .map_err(|_| TransportError::Disconnected)?;
        reply_rx.await.map_err(|_| TransportError::Disconnected)
    }

    pub async fn request(&self, request: Request) -> Result<String, TransportError> {
        self.send(&request.encode()).await
    }

    /// Resolves once the page end has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Creates a connected pair: the observer's [`PageConnection`] and the page's
/// request stream.
pub fn channel(page: PageId) -> (PageConnection, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let connection = PageConnection {
        page,
        tx,
        in_flight: Arc::new(Mutex::new(())),
    };
    (connection, rx)
}
