//! Notification list of the current space.

use std::sync::Arc;

use tw_backend::{NotificationRepository, SpaceRepository};
use tw_core::error::{BackendError, TwResult};
use tw_models::{Notification, Space};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};
use crate::steps::{current_space, SpaceSlot};

use super::{step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationsStep {
    GetCurrentSpace,
    ListNotifications,
    AcknowledgeNotifications,
    DeleteNotifications,
}

pub trait NotificationsObserver: ProgressObserver {
    fn on_get_notifications(&self, _notifications: &[Notification], _unacknowledged: usize) {}
    fn on_acknowledged(&self, _count: usize) {}
    fn on_deleted(&self, _count: usize) {}
}

pub(crate) struct NotificationsFlow {
    spaces: Arc<dyn SpaceRepository>,
    notifications: Arc<dyn NotificationRepository>,
    observer: ObserverSlot<dyn NotificationsObserver>,
    space: Option<Space>,
    list: Vec<Notification>,
    pending_ack: Vec<String>,
    pending_delete: Vec<String>,
}

/// Queue ids not queued yet.
fn enqueue(queue: &mut Vec<String>, ids: Vec<String>) {
    for id in ids {
        if !queue.contains(&id) {
            queue.push(id);
        }
    }
}

impl Workflow for NotificationsFlow {
    type Step = NotificationsStep;

    fn name(&self) -> &'static str {
        "notifications"
    }

    fn on_step_error(&mut self, step: NotificationsStep, error: &BackendError) -> ErrorDisposition {
        let label = step_label(step);
        let error = error.clone();
        self.observer.notify(move |o| o.on_error(&label, &error));
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }

    fn after_step(&mut self, step: NotificationsStep) -> Vec<NotificationsStep> {
        match step {
            NotificationsStep::AcknowledgeNotifications if !self.pending_ack.is_empty() => vec![
                NotificationsStep::AcknowledgeNotifications,
                NotificationsStep::ListNotifications,
            ],
            NotificationsStep::DeleteNotifications if !self.pending_delete.is_empty() => vec![
                NotificationsStep::DeleteNotifications,
                NotificationsStep::ListNotifications,
            ],
            NotificationsStep::AcknowledgeNotifications | NotificationsStep::DeleteNotifications => {
                vec![NotificationsStep::ListNotifications]
            }
            _ => Vec::new(),
        }
    }
}

impl SpaceSlot for NotificationsFlow {
    fn space_repository(&self) -> &Arc<dyn SpaceRepository> {
        &self.spaces
    }

    fn store_current_space(&mut self, space: Space) {
        self.space = Some(space);
    }
}

fn steps() -> Vec<Step<NotificationsFlow>> {
    vec![
        current_space(NotificationsStep::GetCurrentSpace),
        Step::new(NotificationsStep::ListNotifications, |flow: &NotificationsFlow| {
            let notifications = flow.notifications.clone();
            let space_id = flow.space.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            async move {
                let list = notifications.list_notifications(&space_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut NotificationsFlow| {
                    let unacknowledged = list.iter().filter(|n| !n.acknowledged).count();
                    let notified = list.clone();
                    flow.observer
                        .notify(move |o| o.on_get_notifications(&notified, unacknowledged));
                    flow.list = list;
                }))
            }
        })
        .guarded(|flow| flow.space.is_some()),
        Step::new(NotificationsStep::AcknowledgeNotifications, |flow: &NotificationsFlow| {
            let notifications = flow.notifications.clone();
            let sent = flow.pending_ack.clone();
            async move {
                let count = notifications.acknowledge_notifications(&sent).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut NotificationsFlow| {
                    flow.pending_ack.retain(|id| !sent.contains(id));
                    flow.observer.notify(move |o| o.on_acknowledged(count));
                }))
            }
        })
        .guarded(|flow| !flow.pending_ack.is_empty()),
        Step::new(NotificationsStep::DeleteNotifications, |flow: &NotificationsFlow| {
            let notifications = flow.notifications.clone();
            let sent = flow.pending_delete.clone();
            async move {
                let count = notifications.delete_notifications(&sent).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut NotificationsFlow| {
                    flow.pending_delete.retain(|id| !sent.contains(id));
                    flow.observer.notify(move |o| o.on_deleted(count));
                }))
            }
        })
        .guarded(|flow| !flow.pending_delete.is_empty()),
    ]
}

/// Controller of the notification list.
pub struct NotificationsController {
    core: ControllerCore<NotificationsFlow>,
}

impl NotificationsController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn NotificationsObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = NotificationsFlow {
            spaces: ctx.spaces.clone(),
            notifications: ctx.notifications.clone(),
            observer,
            space: None,
            list: Vec::new(),
            pending_ack: Vec::new(),
            pending_delete: Vec::new(),
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    /// Reload the current space and its notifications.
    pub fn refresh(&self) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(|flow| {
            flow.observer.notify(|o| o.show_progress());
            vec![NotificationsStep::GetCurrentSpace, NotificationsStep::ListNotifications]
        });
        Ok(())
    }

    pub fn acknowledge(&self, ids: Vec<String>) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            enqueue(&mut flow.pending_ack, ids);
            vec![NotificationsStep::AcknowledgeNotifications]
        });
        Ok(())
    }

    /// Acknowledge every unacknowledged notification of the last listing.
    pub fn acknowledge_all(&self) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(|flow| {
            flow.observer.notify(|o| o.show_progress());
            let ids = flow
                .list
                .iter()
                .filter(|n| !n.acknowledged)
                .map(|n| n.id.clone())
                .collect();
            enqueue(&mut flow.pending_ack, ids);
            vec![NotificationsStep::AcknowledgeNotifications]
        });
        Ok(())
    }

    pub fn delete(&self, ids: Vec<String>) -> TwResult<()> {
        let handle = self.core.handle()?;
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            enqueue(&mut flow.pending_delete, ids);
            vec![NotificationsStep::DeleteNotifications]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<NotificationsStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for NotificationsController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn state(&self) -> ServiceState {
        self.core.state()
    }

    fn init(&mut self) -> TwResult<()> {
        self.core.init(vec![
            NotificationsStep::GetCurrentSpace,
            NotificationsStep::ListNotifications,
        ])
    }

    fn shutdown(&mut self) -> TwResult<()> {
        self.dispose();
        Ok(())
    }
}
