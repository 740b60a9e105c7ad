//! Twinflow Services - Step sequencer and screen controllers.
//!
//! This crate provides:
//! - The generic step sequencer (state machine and actor)
//! - The UI dispatch thread and detachable observer slots
//! - The service lifecycle trait and the diagnostics event bus
//! - `ServiceContext`, bundling the capabilities controllers receive
//! - Screen controllers: profile and space creation, contact editing,
//!   migration scanning, notifications, subscriptions, room configuration

pub mod service;
pub mod event_bus;
pub mod ui;
pub mod observer;
pub mod context;
pub mod sequencer;
pub mod steps;
pub mod controllers;

// Re-export key types
pub use context::ServiceContext;
pub use event_bus::{AppEvent, EventBus};
pub use observer::{ObserverSlot, ProgressObserver};
pub use sequencer::{ErrorDisposition, Sequencer, SequencerHandle, SequencerSnapshot, Step, StepStatus, Workflow};
pub use service::{Service, ServiceState};
pub use ui::{UiHandle, UiThread};
