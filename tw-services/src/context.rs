//! Capabilities and shared infrastructure handed to controllers.

use std::sync::Arc;

use tokio::sync::watch;

use tw_backend::{
    Backend, BackendStatus, ContactRepository, MigrationRepository, NotificationRepository,
    ProfileRepository, RoomRepository, SpaceRepository, SubscriptionRepository,
    TwincodeRepository,
};
use tw_core::Platform;

use crate::event_bus::EventBus;
use crate::ui::UiHandle;

/// Everything a controller may use. Each controller copies out only the
/// capabilities its steps call.
#[derive(Clone)]
pub struct ServiceContext {
    pub spaces: Arc<dyn SpaceRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub twincodes: Arc<dyn TwincodeRepository>,
    pub migrations: Arc<dyn MigrationRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub ui: UiHandle,
    pub event_bus: EventBus,
    /// Backend availability followed by every sequencer.
    pub status: watch::Receiver<BackendStatus>,
    /// Publish step events on `event_bus`.
    pub trace_steps: bool,
    /// Device name sent with account migrations.
    pub device_name: String,
}

impl ServiceContext {
    /// Build a context where every capability is served by `backend`.
    pub fn from_backend<B: Backend + 'static>(
        backend: Arc<B>,
        ui: UiHandle,
        event_bus: EventBus,
        status: watch::Receiver<BackendStatus>,
    ) -> Self {
        Self {
            spaces: backend.clone(),
            profiles: backend.clone(),
            contacts: backend.clone(),
            notifications: backend.clone(),
            twincodes: backend.clone(),
            migrations: backend.clone(),
            subscriptions: backend.clone(),
            rooms: backend,
            ui,
            event_bus,
            status,
            trace_steps: false,
            device_name: Platform::hostname(),
        }
    }

    pub fn with_trace_steps(mut self, trace_steps: bool) -> Self {
        self.trace_steps = trace_steps;
        self
    }

    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    /// The event bus sequencers should publish on, if tracing is enabled.
    pub fn step_events(&self) -> Option<EventBus> {
        self.trace_steps.then(|| self.event_bus.clone())
    }
}
