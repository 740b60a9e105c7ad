//! Backend availability signal.
//!
//! Sequencers never probe the backend themselves: they follow the status
//! published here and retry parked steps when it turns `Online`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Availability of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// Not initialized yet; calls must not be issued.
    NotReady,
    Online,
    /// Initialized but unreachable; calls fail with `TransientOffline`.
    Offline,
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "not_ready"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Publishes `BackendStatus` changes over a watch channel.
#[derive(Clone)]
pub struct Connectivity {
    state_tx: Arc<watch::Sender<BackendStatus>>,
}

impl Connectivity {
    /// Create a publisher with the given initial status.
    pub fn new(initial: BackendStatus) -> Self {
        let (state_tx, _) = watch::channel(initial);
        Self {
            state_tx: Arc::new(state_tx),
        }
    }

    /// Publish a new status. Subscribers are only woken on actual changes.
    pub fn set_status(&self, status: BackendStatus) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            info!("backend status changed to {status}");
        } else {
            debug!("backend status unchanged ({status})");
        }
    }

    pub fn set_online(&self) {
        self.set_status(BackendStatus::Online);
    }

    pub fn set_offline(&self) {
        self.set_status(BackendStatus::Offline);
    }

    /// Current status.
    pub fn status(&self) -> BackendStatus {
        *self.state_tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status() == BackendStatus::Online
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<BackendStatus> {
        self.state_tx.subscribe()
    }

    /// Switch online after `delay` on a background task.
    pub fn schedule_online(&self, delay: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.set_online();
        })
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(BackendStatus::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(BackendStatus::NotReady.to_string(), "not_ready");
        assert_eq!(BackendStatus::Online.to_string(), "online");
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_only() {
        let connectivity = Connectivity::default();
        let mut rx = connectivity.subscribe();
        assert_eq!(*rx.borrow_and_update(), BackendStatus::NotReady);

        connectivity.set_offline();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), BackendStatus::Offline);

        connectivity.set_offline();
        assert!(!rx.has_changed().unwrap());
        assert!(!connectivity.is_online());
    }

    #[tokio::test]
    async fn test_schedule_online() {
        let connectivity = Connectivity::new(BackendStatus::Offline);
        let mut rx = connectivity.subscribe();
        connectivity.schedule_online(Duration::from_millis(10));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), BackendStatus::Online);
    }
}
