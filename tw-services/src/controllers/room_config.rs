//! Room settings: welcome message, chat mode and invitation mode.

use std::sync::Arc;

use tw_backend::RoomRepository;
use tw_core::error::{BackendError, TwResult};
use tw_models::{ChatMode, Contact, InvitationMode, RoomConfig, RoomConfigUpdate};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};

use super::{reject, step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomConfigStep {
    GetRoom,
    GetRoomConfig,
    UpdateRoomConfig,
}

pub trait RoomConfigObserver: ProgressObserver {
    fn on_get_room(&self, _room: &Contact) {}
    fn on_room_not_found(&self) {}
    fn on_get_room_config(&self, _config: &RoomConfig) {}
    fn on_update_room_config(&self, _config: &RoomConfig) {}
}

pub(crate) struct RoomConfigFlow {
    rooms: Arc<dyn RoomRepository>,
    observer: ObserverSlot<dyn RoomConfigObserver>,
    room_id: Option<String>,
    room: Option<Contact>,
    config: Option<RoomConfig>,
    pending: RoomConfigUpdate,
}

impl RoomConfigFlow {
    fn loaded_id(&self) -> String {
        self.room.as_ref().map(|r| r.id.clone()).unwrap_or_default()
    }
}

impl Workflow for RoomConfigFlow {
    type Step = RoomConfigStep;

    fn name(&self) -> &'static str {
        "room_config"
    }

    fn on_step_error(&mut self, step: RoomConfigStep, error: &BackendError) -> ErrorDisposition {
        if error.is_not_found() {
            self.room = None;
            self.config = None;
            self.observer.notify(|o| o.on_room_not_found());
        } else {
            let label = step_label(step);
            let error = error.clone();
            self.observer.notify(move |o| o.on_error(&label, &error));
        }
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }

    fn after_step(&mut self, step: RoomConfigStep) -> Vec<RoomConfigStep> {
        match step {
            RoomConfigStep::GetRoom if self.room.is_none() => vec![RoomConfigStep::GetRoom],
            RoomConfigStep::UpdateRoomConfig if !self.pending.is_empty() => {
                vec![RoomConfigStep::UpdateRoomConfig]
            }
            _ => Vec::new(),
        }
    }
}

fn steps() -> Vec<Step<RoomConfigFlow>> {
    vec![
        Step::new(RoomConfigStep::GetRoom, |flow: &RoomConfigFlow| {
            let rooms = flow.rooms.clone();
            let room_id = flow.room_id.clone().unwrap_or_default();
            async move {
                let room = rooms.get_room(&room_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut RoomConfigFlow| {
                    if flow.room_id.as_deref() != Some(room.id.as_str()) {
                        return;
                    }
                    let notified = room.clone();
                    flow.observer.notify(move |o| o.on_get_room(&notified));
                    flow.room = Some(room);
                }))
            }
        })
        .guarded(|flow| flow.room_id.is_some()),
        Step::new(RoomConfigStep::GetRoomConfig, |flow: &RoomConfigFlow| {
            let rooms = flow.rooms.clone();
            let room_id = flow.loaded_id();
            async move {
                let config = rooms.get_room_config(&room_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut RoomConfigFlow| {
                    if flow.loaded_id() != config.room_id {
                        return;
                    }
                    let notified = config.clone();
                    flow.observer.notify(move |o| o.on_get_room_config(&notified));
                    flow.config = Some(config);
                }))
            }
        })
        .guarded(|flow| flow.room.is_some()),
        Step::new(RoomConfigStep::UpdateRoomConfig, |flow: &RoomConfigFlow| {
            let rooms = flow.rooms.clone();
            let room_id = flow.loaded_id();
            let sent = flow.pending.clone();
            async move {
                let config = rooms.update_room_config(&room_id, &sent).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut RoomConfigFlow| {
                    if flow.pending == sent {
                        flow.pending = RoomConfigUpdate::default();
                    }
                    let notified = config.clone();
                    flow.observer.notify(move |o| o.on_update_room_config(&notified));
                    flow.config = Some(config);
                }))
            }
        })
        .guarded(|flow| flow.room.is_some() && flow.config.is_some() && !flow.pending.is_empty()),
    ]
}

/// Controller of the room settings screen.
pub struct RoomConfigController {
    core: ControllerCore<RoomConfigFlow>,
}

impl RoomConfigController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn RoomConfigObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = RoomConfigFlow {
            rooms: ctx.rooms.clone(),
            observer,
            room_id: None,
            room: None,
            config: None,
            pending: RoomConfigUpdate::default(),
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    pub fn load(&self, room_id: &str) -> TwResult<()> {
        let handle = self.core.handle()?;
        let room_id = room_id.to_string();
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.room_id = Some(room_id);
            flow.room = None;
            flow.config = None;
            flow.pending = RoomConfigUpdate::default();
            vec![RoomConfigStep::GetRoom, RoomConfigStep::GetRoomConfig]
        });
        Ok(())
    }

    /// An empty message removes the welcome message.
    pub fn set_welcome_message(&self, message: &str) -> TwResult<()> {
        let message = message.to_string();
        self.edit(move |pending| pending.welcome_message = Some(message))
    }

    pub fn set_chat_mode(&self, mode: ChatMode) -> TwResult<()> {
        self.edit(move |pending| pending.chat_mode = Some(mode))
    }

    pub fn set_invitation_mode(&self, mode: InvitationMode) -> TwResult<()> {
        self.edit(move |pending| pending.invitation_mode = Some(mode))
    }

    fn edit<F>(&self, edit: F) -> TwResult<()>
    where
        F: FnOnce(&mut RoomConfigUpdate) + Send + 'static,
    {
        let handle = self.core.handle()?;
        handle.update(move |flow| {
            if flow.room_id.is_none() {
                reject(&flow.observer, RoomConfigStep::UpdateRoomConfig, "no room loaded");
                return Vec::new();
            }
            flow.observer.notify(|o| o.show_progress());
            edit(&mut flow.pending);
            vec![RoomConfigStep::UpdateRoomConfig]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<RoomConfigStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for RoomConfigController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn state(&self) -> ServiceState {
        self.core.state()
    }

    fn init(&mut self) -> TwResult<()> {
        self.core.init(Vec::new())
    }

    fn shutdown(&mut self) -> TwResult<()> {
        self.dispose();
        Ok(())
    }
}
