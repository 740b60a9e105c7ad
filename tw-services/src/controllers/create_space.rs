//! Create a space, optionally switching to it.

use std::sync::Arc;

use tw_backend::SpaceRepository;
use tw_core::error::{BackendError, TwResult};
use tw_models::Space;

use crate::context::ServiceContext;
use crate::observer::{ObserverSlot, ProgressObserver};
use crate::sequencer::{apply, ErrorDisposition, SequencerSnapshot, Step, Workflow};
use crate::service::{Service, ServiceState};

use super::{step_label, ControllerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CreateSpaceStep {
    CreateSpace,
    SetCurrentSpace,
}

pub trait CreateSpaceObserver: ProgressObserver {
    fn on_create_space(&self, _space: &Space) {}
    fn on_set_current_space(&self, _space: &Space) {}
}

#[derive(Debug, Clone)]
struct SpaceRequest {
    name: String,
    description: Option<String>,
    make_current: bool,
}

pub(crate) struct CreateSpaceFlow {
    spaces: Arc<dyn SpaceRepository>,
    observer: ObserverSlot<dyn CreateSpaceObserver>,
    request: Option<SpaceRequest>,
    created: Option<Space>,
    make_current: bool,
}

impl Workflow for CreateSpaceFlow {
    type Step = CreateSpaceStep;

    fn name(&self) -> &'static str {
        "create_space"
    }

    fn on_step_error(&mut self, step: CreateSpaceStep, error: &BackendError) -> ErrorDisposition {
        let label = step_label(step);
        let error = error.clone();
        self.observer.notify(move |o| o.on_error(&label, &error));
        ErrorDisposition::Abort
    }

    fn on_finished(&mut self) {
        self.observer.notify(|o| o.hide_progress());
    }
}

fn steps() -> Vec<Step<CreateSpaceFlow>> {
    vec![
        Step::new(CreateSpaceStep::CreateSpace, |flow: &CreateSpaceFlow| {
            let spaces = flow.spaces.clone();
            let request = flow.request.clone();
            async move {
                let request = request.ok_or_else(|| BackendError::not_found("space request"))?;
                let space = spaces
                    .create_space(&request.name, request.description.as_deref())
                    .await?;
                Ok::<_, BackendError>(apply(move |flow: &mut CreateSpaceFlow| {
                    let notified = space.clone();
                    flow.observer.notify(move |o| o.on_create_space(&notified));
                    flow.make_current = request.make_current;
                    flow.request = None;
                    flow.created = Some(space);
                }))
            }
        })
        .guarded(|flow| flow.request.is_some()),
        Step::new(CreateSpaceStep::SetCurrentSpace, |flow: &CreateSpaceFlow| {
            let spaces = flow.spaces.clone();
            let space_id = flow.created.as_ref().map(|s| s.id.clone()).unwrap_or_default();
            async move {
                let space = spaces.set_current_space(&space_id).await?;
                Ok::<_, BackendError>(apply(move |flow: &mut CreateSpaceFlow| {
                    let notified = space.clone();
                    flow.observer.notify(move |o| o.on_set_current_space(&notified));
                    flow.created = Some(space);
                }))
            }
        })
        .guarded(|flow| flow.created.is_some() && flow.make_current),
    ]
}

/// Controller of the "new space" screen.
pub struct CreateSpaceController {
    core: ControllerCore<CreateSpaceFlow>,
}

impl CreateSpaceController {
    pub fn new(ctx: &ServiceContext, observer: Arc<dyn CreateSpaceObserver>) -> Self {
        let observer = ObserverSlot::new(observer, ctx.ui.clone());
        let slot = observer.clone();
        let flow = CreateSpaceFlow {
            spaces: ctx.spaces.clone(),
            observer,
            request: None,
            created: None,
            make_current: false,
        };
        Self {
            core: ControllerCore::new(ctx, flow, steps(), move || slot.detach()),
        }
    }

    pub fn create_space(
        &self,
        name: &str,
        description: Option<&str>,
        make_current: bool,
    ) -> TwResult<()> {
        let handle = self.core.handle()?;
        let request = SpaceRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            make_current,
        };
        handle.update(move |flow| {
            flow.observer.notify(|o| o.show_progress());
            flow.request = Some(request);
            flow.created = None;
            flow.make_current = false;
            vec![CreateSpaceStep::CreateSpace, CreateSpaceStep::SetCurrentSpace]
        });
        Ok(())
    }

    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<CreateSpaceStep>> {
        self.core.snapshot().await
    }

    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Service for CreateSpaceController {
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
