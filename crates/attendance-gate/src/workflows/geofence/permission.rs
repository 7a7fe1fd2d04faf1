use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use super::domain::PermissionState;

/// Read-only view of the host's location permission.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn probe(&self) -> PermissionState;

    /// Change notifications, when the host can deliver them.
    fn subscribe(&self) -> Option<watch::Receiver<PermissionState>> {
        None
    }
}

/// Permission state pushed in by the host, with change notifications for subscribers.
#[derive(Debug)]
pub struct PermissionWatch {
    sender: watch::Sender<PermissionState>,
}

impl PermissionWatch {
    pub fn new(initial: PermissionState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn current(&self) -> PermissionState {
        *self.sender.borrow()
    }

    /// Record a new host state. Returns `true` when subscribers were notified.
    pub fn update(&self, state: PermissionState) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            info!(permission = state.label(), "location permission changed");
        }
        changed
    }
}

#[async_trait]
impl PermissionProbe for PermissionWatch {
    async fn probe(&self) -> PermissionState {
        self.current()
    }

    fn subscribe(&self) -> Option<watch::Receiver<PermissionState>> {
        Some(self.sender.subscribe())
    }
}

/// Probe for hosts without a permission query capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPermissions;

#[async_trait]
impl PermissionProbe for UnsupportedPermissions {
    async fn probe(&self) -> PermissionState {
        PermissionState::Unsupported
    }
}
