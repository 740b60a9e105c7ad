//! Step declarations shared between controllers.

use std::sync::Arc;

use tw_backend::SpaceRepository;
use tw_core::error::BackendError;
use tw_models::Space;

use crate::sequencer::{apply, Step, Workflow};

/// A workflow that tracks the current space.
pub trait SpaceSlot: Workflow {
    fn space_repository(&self) -> &Arc<dyn SpaceRepository>;

    /// Store the loaded space and tell the observer.
    fn store_current_space(&mut self, space: Space);
}

/// Load the current space into the workflow.
pub fn current_space<W: SpaceSlot>(id: W::Step) -> Step<W> {
    Step::new(id, |workflow: &W| {
        let spaces = workflow.space_repository().clone();
        async move {
            let space = spaces.get_current_space().await?;
            Ok::<_, BackendError>(apply(move |workflow: &mut W| workflow.store_current_space(space)))
        }
    })
}
