//! Diagnostics event bus.
//!
//! Sequencers publish step-level events here when step tracing is enabled.
//! Nothing in the workflow path depends on these events; they exist for
//! logging front ends such as `twinflow --trace`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use tw_backend::BackendStatus;

/// Events describing sequencer progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// A step's backend call was issued.
    StepStarted {
        workflow: String,
        step: String,
    },
    /// A step's result was applied.
    StepCompleted {
        workflow: String,
        step: String,
    },
    /// A step hit the backend offline and waits for the online signal.
    StepStalled {
        workflow: String,
        step: String,
    },
    /// A step failed with a non-offline error.
    StepFailed {
        workflow: String,
        step: String,
        code: i32,
        error: String,
    },
    /// Every eligible requested step is completed.
    WorkflowFinished {
        workflow: String,
    },
    /// The sequencer actor stopped.
    WorkflowDisposed {
        workflow: String,
    },
    /// Backend availability changed.
    BackendStatusChanged {
        status: BackendStatus,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Slow subscribers that fall behind
/// receive a `Lagged` error and miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Republish backend status changes as `BackendStatusChanged` events.
    pub fn forward_backend_status(&self, mut status: watch::Receiver<BackendStatus>) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                bus.emit(AppEvent::BackendStatusChanged { status: current });
            }
        })
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::StepStarted { .. } => "StepStarted",
        AppEvent::StepCompleted { .. } => "StepCompleted",
        AppEvent::StepStalled { .. } => "StepStalled",
        AppEvent::StepFailed { .. } => "StepFailed",
        AppEvent::WorkflowFinished { .. } => "WorkflowFinished",
        AppEvent::WorkflowDisposed { .. } => "WorkflowDisposed",
        AppEvent::BackendStatusChanged { .. } => "BackendStatusChanged",
    }
}
