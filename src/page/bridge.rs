use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::Registry;
use crate::protocol::Request;
use crate::transport::{Envelope, PageId};

/// Page-side end of a connection. Dropping it (or calling [`PageHandle::close`])
/// stops answering requests, which the observer sees as a disconnect.
#[derive(Debug)]
pub struct PageHandle {
    page: PageId,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PageHandle {
    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    /// Closes the bridge and waits for its task to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) fn spawn(page: PageId, registry: Arc<Registry>, requests: mpsc::Receiver<Envelope>) -> PageHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(serve(page, registry, requests, token.clone()));
    PageHandle {
        page,
        token,
        task: Some(task),
    }
}

async fn serve(
    page: PageId,
    registry: Arc<Registry>,
    mut requests: mpsc::Receiver<Envelope>,
    token: CancellationToken,
) {
    info!(%page, "page bridge open");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            envelope = requests.recv() => {
                let Some(envelope) = envelope else { break };
                let reply = dispatch(&registry, envelope.request());
                envelope.respond(reply);
            }
        }
    }
    info!(%page, "page bridge closed");
}

/// Answers one request. Anything the page can't answer gets `null`.
pub(crate) fn dispatch(registry: &Registry, request: &str) -> String {
    match Request::decode(request) {
        Ok(Request::GetVariables) => match registry.snapshot_json() {
            Ok(json) => {
                debug!(variables = registry.len(), "answered getVariables");
                json
            }
            Err(e) => {
                warn!("failed to encode snapshot: {}", e);
                "null".to_string()
            }
        },
        Err(e) => {
            warn!("rejected request {:?}: {}", request, e);
            "null".to_string()
        }
    }
}
