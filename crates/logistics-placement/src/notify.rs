//! Change notification
//!
//! After each committed mutation the coordinator calls every registered
//! `ChangeNotifier`. Notifiers decide whether and how to push a fresh
//! snapshot; the coordinator knows nothing about transport.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use logistics_core::Result;

use crate::snapshot::InventorySnapshot;

/// Something that can produce the current inventory view on demand
pub trait SnapshotSource {
    fn snapshot(&self) -> Result<InventorySnapshot>;
}

/// Receives a callback after every successful mutation
pub trait ChangeNotifier: Send + Sync {
    fn notify_changed(&self, source: &dyn SnapshotSource);
}

/// Publishes snapshots on a `tokio::sync::watch` channel.
///
/// A snapshot is only built while at least one observer is subscribed.
#[derive(Debug)]
pub struct WatchNotifier {
    tx: watch::Sender<Option<Arc<InventorySnapshot>>>,
}

impl WatchNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Observe published snapshots. The receiver starts at the latest one.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<InventorySnapshot>>> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Option<Arc<InventorySnapshot>> {
        self.tx.borrow().clone()
    }
}

impl Default for WatchNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for WatchNotifier {
    fn notify_changed(&self, source: &dyn SnapshotSource) {
        if self.tx.receiver_count() == 0 {
            debug!("No observers, skipping snapshot broadcast");
            return;
        }
        match source.snapshot() {
            Ok(snapshot) => {
                self.tx.send_replace(Some(Arc::new(snapshot)));
            }
            Err(e) => warn!("Failed to build snapshot for observers: {}", e),
        }
    }
}
