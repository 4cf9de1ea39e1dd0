use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use crate::error::RelayError;

/// Sending half of a connected peer's outbound frame queue.
pub type Outbound = mpsc::Sender<String>;

/// Creates the bounded queue a session drains into its socket.
pub fn outbound_channel(capacity: usize) -> (Outbound, mpsc::Receiver<String>) {
    mpsc::channel(capacity.max(1))
}

/// Queues `frame` for peer `id` without waiting. A full or closed queue is a delivery failure.
pub fn deliver(id: &str, channel: &Outbound, frame: String) -> Result<(), RelayError> {
    channel.try_send(frame).map_err(|e| {
        let reason = match e {
            TrySendError::Full(_) => "outbound queue full",
            TrySendError::Closed(_) => "connection closed",
        };
        RelayError::Delivery {
            peer: id.to_string(),
            reason: reason.to_string(),
        }
    })
}

/// Connected peers keyed by username.
///
/// Every operation takes the lock once, so lookups and snapshots never observe a
/// half-applied registration.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    peers: Arc<RwLock<HashMap<String, Outbound>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `id`, silently replacing any earlier registration under the same name.
    pub fn register(&self, id: &str, channel: Outbound) {
        let displaced = self.peers.write().insert(id.to_string(), channel);
        if displaced.is_some() {
            info!("Peer {} re-registered, previous connection displaced", id);
        } else {
            info!("Registered peer {}", id);
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.peers.write().remove(id).is_some();
        if removed {
            info!("Unregistered peer {}", id);
        }
        removed
    }

    /// Removes `id` only while it still maps to `channel`.
    pub fn release(&self, id: &str, channel: &Outbound) -> bool {
        let mut peers = self.peers.write();
        match peers.get(id) {
            Some(current) if current.same_channel(channel) => {
                peers.remove(id);
                info!("Unregistered peer {}", id);
                true
            }
            Some(_) => {
                debug!("Peer {} already re-registered, keeping newer connection", id);
                false
            }
            None => false,
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Outbound> {
        self.peers.read().get(id).cloned()
    }

    pub fn snapshot(&self) -> Vec<(String, Outbound)> {
        self.peers
            .read()
            .iter()
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.peers.read().len()
    }
}
