//! One-shot member-up signal for this node.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// This node's view of its own cluster membership.
///
/// Starts as not-up. [`mark_up`](Self::mark_up) is the one-time member-up event; anything
/// waiting in [`wait_until_up`](Self::wait_until_up) is released by it.
#[derive(Clone)]
pub struct ClusterMembership {
    up: Arc<watch::Sender<bool>>,
}

impl ClusterMembership {
    pub fn new() -> Self {
        let (up, _) = watch::channel(false);
        Self { up: Arc::new(up) }
    }

    pub fn mark_up(&self) {
        if !self.up.send_replace(true) {
            info!("Member up");
        }
    }

    pub fn is_up(&self) -> bool {
        *self.up.borrow()
    }

    pub async fn wait_until_up(&self) {
        let mut receiver = self.up.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|up| *up).await;
    }
}

impl Default for ClusterMembership {
    fn default() -> Self {
        Self::new()
    }
}
