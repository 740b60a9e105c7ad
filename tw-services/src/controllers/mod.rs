//! Screen controllers.
//!
//! Each controller declares its steps, owns a sequencer driving them, and
//! exposes public triggers. Observer callbacks are delivered on the UI
//! thread. Once `dispose` returns, only a callback the UI thread is already
//! running can still complete.

pub mod create_profile;
pub mod create_space;
pub mod edit_contact;
pub mod migration_scan;
pub mod notifications;
pub mod room_config;
pub mod subscription;

pub use create_profile::{CreateProfileController, CreateProfileObserver, CreateProfileStep};
pub use create_space::{CreateSpaceController, CreateSpaceObserver, CreateSpaceStep};
pub use edit_contact::{EditContactController, EditContactObserver, EditContactStep};
pub use migration_scan::{MigrationScanController, MigrationScanObserver, MigrationScanStep};
pub use notifications::{NotificationsController, NotificationsObserver, NotificationsStep};
pub use room_config::{RoomConfigController, RoomConfigObserver, RoomConfigStep};
pub use subscription::{SubscriptionController, SubscriptionObserver, SubscriptionStep};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use tw_core::error::{BackendError, ErrorKind, TwError, TwResult};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{Sequencer, SequencerHandle, SequencerSnapshot, Step, Workflow};
use crate::service::ServiceState;

/// Lifecycle plumbing shared by every controller: the sequencer, the
/// connectivity follower and the observer detach hook.
pub(crate) struct ControllerCore<W: Workflow> {
    name: &'static str,
    state: ServiceState,
    pending: Option<(W, Vec<Step<W>>)>,
    ctx: ServiceContext,
    handle: Option<SequencerHandle<W>>,
    follower: Option<JoinHandle<()>>,
    detach: Box<dyn Fn() + Send + Sync>,
}

impl<W: Workflow> ControllerCore<W> {
    pub(crate) fn new<D>(ctx: &ServiceContext, workflow: W, steps: Vec<Step<W>>, detach: D) -> Self
    where
        D: Fn() + Send + Sync + 'static,
    {
        Self {
            name: workflow.name(),
            state: ServiceState::Created,
            pending: Some((workflow, steps)),
            ctx: ctx.clone(),
            handle: None,
            follower: None,
            detach: Box::new(detach),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn state(&self) -> ServiceState {
        self.state
    }

    /// Spawn the sequencer and follow backend availability. `initial`
    /// steps are requested right away.
    pub(crate) fn init(&mut self, initial: Vec<W::Step>) -> TwResult<()> {
        let Some((workflow, steps)) = self.pending.take() else {
            return match self.state {
                ServiceState::Running => Ok(()),
                _ => Err(TwError::Disposed(self.name.to_string())),
            };
        };

        let handle = Sequencer::new(workflow, steps)
            .with_events(self.ctx.step_events())
            .spawn();
        self.follower = Some(handle.follow(self.ctx.status.clone()));
        handle.request_steps(initial);
        self.handle = Some(handle);
        self.state = ServiceState::Running;
        info!("controller {} started", self.name);
        Ok(())
    }

    /// The running sequencer, or why there is none.
    pub(crate) fn handle(&self) -> TwResult<&SequencerHandle<W>> {
        match (self.state, &self.handle) {
            (ServiceState::Running, Some(handle)) => Ok(handle),
            (ServiceState::Created, _) => Err(TwError::ServiceNotInitialized(self.name.to_string())),
            _ => Err(TwError::Disposed(self.name.to_string())),
        }
    }

    pub(crate) async fn snapshot(&self) -> TwResult<SequencerSnapshot<W::Step>> {
        self.handle()?.snapshot().await
    }

    /// Detach the observer first, then stop the sequencer.
    pub(crate) fn dispose(&mut self) {
        if self.state == ServiceState::Stopped {
            return;
        }
        (self.detach)();
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
        if let Some(handle) = self.handle.take() {
            handle.dispose();
        }
        self.pending = None;
        self.state = ServiceState::Stopped;
        debug!("controller {} disposed", self.name);
    }
}

impl<W: Workflow> Drop for ControllerCore<W> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Label of a step for observer error callbacks.
pub(crate) fn step_label<S: std::fmt::Debug>(step: S) -> String {
    format!("{step:?}")
}

/// Report a trigger whose step cannot run against what the controller holds.
/// Nothing is requested, so no progress callbacks follow.
pub(crate) fn reject<O, S>(observer: &ObserverSlot<O>, step: S, reason: &'static str)
where
    O: ?Sized + ProgressObserver + 'static,
    S: std::fmt::Debug,
{
    info!("rejecting {step:?}: {reason}");
    let label = step_label(step);
    let error = BackendError::other(ErrorKind::InvalidState, reason);
    observer.notify(move |o| o.on_error(&label, &error));
}
