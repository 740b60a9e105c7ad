//! Step declarations.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;

use tw_core::error::BackendResult;

use super::engine::Workflow;

/// Identifier of a step within one sequencer. Usually a fieldless enum.
pub trait StepKey: Copy + Ord + Hash + Debug + Send + Sync + 'static {}

impl<T> StepKey for T where T: Copy + Ord + Hash + Debug + Send + Sync + 'static {}

/// Result of a successful call, applied to the workflow context on the actor.
pub type Apply<W> = Box<dyn FnOnce(&mut W) + Send>;

/// In-flight backend call of a step.
pub type StepFuture<W> = Pin<Box<dyn Future<Output = BackendResult<Apply<W>>> + Send>>;

type Guard<W> = Arc<dyn Fn(&W) -> bool + Send + Sync>;
type Call<W> = Arc<dyn Fn(&W) -> StepFuture<W> + Send + Sync>;

/// Box a context mutation as a step result.
pub fn apply<W, F>(f: F) -> Apply<W>
where
    F: FnOnce(&mut W) + Send + 'static,
{
    Box::new(f)
}

/// One declared step: identifier, optional guard and backend call.
///
/// The call reads what it needs from the context and returns a future that
/// owns its inputs; the context is never borrowed across the call.
pub struct Step<W: Workflow> {
    id: W::Step,
    guard: Option<Guard<W>>,
    call: Call<W>,
}

impl<W: Workflow> Step<W> {
    pub fn new<F, Fut>(id: W::Step, call: F) -> Self
    where
        F: Fn(&W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BackendResult<Apply<W>>> + Send + 'static,
    {
        Self {
            id,
            guard: None,
            call: Arc::new(move |workflow: &W| -> StepFuture<W> { Box::pin(call(workflow)) }),
        }
    }

    /// Only run this step while `guard` holds.
    pub fn guarded<G>(mut self, guard: G) -> Self
    where
        G: Fn(&W) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn id(&self) -> W::Step {
        self.id
    }

    /// Whether the guard currently holds.
    pub fn is_eligible(&self, workflow: &W) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(workflow))
    }

    pub(crate) fn start(&self, workflow: &W) -> StepFuture<W> {
        (self.call)(workflow)
    }
}

impl<W: Workflow> Debug for Step<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
