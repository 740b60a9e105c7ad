//! Create a profile and bind it to the current space.
//!
//! Requests queue up: each one is created in turn and the last created
//! profile is bound.

use std::collections::VecDeque;
use std::sync::Arc;

use tw_backend::{ProfileRepository, SpaceRepository};
use tw_core::error::{BackendError, TwResult};
use tw_models::{Profile, Space};

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};
use crate::steps::{current_space, SpaceSlot};

use super::{step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CreateProfileStep {
    GetCurrentSpace,
    CreateProfile,
    BindProfile,
}

pub trait CreateProfileObserver: ProgressObserver {
    fn on_get_space(&self, _space: &Space) {}
    fn on_create_profile(&self, _profile: &Profile) {}
    /// The space now carries the new profile.
    fn on_update_space(&self, _space: &Space) {}
}

#[derive(Debug, Clone)]
struct ProfileRequest {
    name: String,
    description: Option<String>,
}

pub(crate) struct CreateProfileFlow {
    spaces: Arc<dyn SpaceRepository>,
    profiles: Arc<dyn ProfileRepository>,
    observer: ObserverSlot<dyn CreateProfileObserver>,
    space: Option<Space>,
    requests: VecDeque<ProfileRequest>,
    profile: Option<Profile>,
}

impl Workflow for CreateProfileFlow {
    type Step = CreateProfileStep;

    fn name(&self) -> &'static str {
        "create_profile"
    }

    fn on_step_error(&mut self, step: CreateProfileStep, error: &BackendError) -> ErrorDisposition {
        self.requests.clear();
        let label = step_label(step);
        let error = error.clone();
        self.observer.notify(move |o| o.on_error(&label, &error));
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }

    fn after_step(&mut self, step: CreateProfileStep) -> Vec<CreateProfileStep> {
        match step {
            CreateProfileStep::CreateProfile if !self.requests.is_empty() => {
                vec![CreateProfileStep::CreateProfile]
            }
            _ => Vec::new(),
        }
    }
}

impl SpaceSlot for CreateProfileFlow {
    fn space_repository(&self) -> &Arc<dyn SpaceRepository> {
        &self.spaces
    }

    fn store_current_space(&mut self, space: Space) {
        let notified = space.clone();
        self.observer.notify(move |o| o.on_get_space(&notified));
        self.space = Some(space);
    }
}

fn steps() -> Vec<Step<CreateProfileFlow>> {
    vec![
        current_space(CreateProfileStep::GetCurrentSpace),
        Step::new(CreateProfileStep::CreateProfile, |flow: &CreateProfileFlow| {
            let profiles = flow.profiles.clone();
            let request = flow.requests.front().cloned();
            async move {
                let request = request.ok_or_else(|| BackendError::not_found("profile request"))?;
                let profile = profiles
                    .create_profile(&request.name, request.description.as_deref())
                    .await?;
                Ok::<_, BackendError>(apply(move |flow: &mut CreateProfileFlow| {
                    let notified = profile.clone();
                    flow.observer.notify(move |o| o.on_create_profile(&notified));
                    flow.requests.pop_front();
                    flow.profile = Some(profile);
                }))
            }
        })
        .guarded(|flow| !flow.requests.is_empty()),
        Step::new(CreateProfileStep::BindProfile, |flow: &CreateProfileFlow| {
            let spaces = flow.spaces.clone();
            let space_id = flow.space.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            let profile_id = flow.profile.as_ref().map(|p| p.id.clone()).unwrap_or_default();
            async move {
                let space = spaces.bind_profile(&space_id, &profile_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut CreateProfileFlow| {
                    let notified = space.clone();
                    flow.observer.notify(move |o| o.on_update_space(&notified));
                    flow.space = Some(space);
                }))
            }
        })
        .guarded(|flow| flow.space.is_some() && flow.profile.is_some()),
    ]
}

/// Controller of the "new profile" screen.
pub struct CreateProfileController {
    core: ControllerCore<CreateProfileFlow>,
}

impl CreateProfileController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn CreateProfileObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = CreateProfileFlow {
            spaces: ctx.spaces.clone(),
            profiles: ctx.profiles.clone(),
            observer,
            space: None,
            requests: VecDeque::new(),
            profile: None,
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    /// Create a profile and bind it to the current space.
    pub fn create_profile(&self, name: &str, description: Option<&str>) -> TwResult<()> {
        let handle = self.core.handle()?;
        let request = ProfileRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.requests.push_back(request);
            flow.profile = None;
            vec![
                CreateProfileStep::GetCurrentSpace,
                CreateProfileStep::CreateProfile,
                CreateProfileStep::BindProfile,
            ]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<CreateProfileStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for CreateProfileController {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn state(&self) -> ServiceState {
        self.core.state()
    }

    fn init(&mut self) -> TwResult<()> {
        self.core.init(vec![CreateProfileStep::GetCurrentSpace])
    }

    fn shutdown(&mut self) -> TwResult<()> {
        self.dispose();
        Ok(())
    }
}
