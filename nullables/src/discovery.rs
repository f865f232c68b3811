//! Nullable peer discovery fed by the test.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use strata_node::jobs::PeerDiscovery;
use strata_types::PeerRecord;

/// A discovery source that yields whatever the test announces.
///
/// Open until [`close`](Self::close); after that every `next_peer` returns
/// `None` once the queued peers are drained.
pub struct NullPeerDiscovery {
    tx: Mutex<Option<mpsc::UnboundedSender<PeerRecord>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PeerRecord>>,
}

impl NullPeerDiscovery {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Queue `record` for the next `next_peer` call. Ignored once closed.
    pub fn announce(&self, record: PeerRecord) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = tx.as_ref() {
            let _ = tx.send(record);
        }
    }

    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Default for NullPeerDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerDiscovery for NullPeerDiscovery {
    async fn next_peer(&self) -> Option<PeerRecord> {
        self.rx.lock().await.recv().await
    }
}
