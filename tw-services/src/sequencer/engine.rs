//! Sequencer actor.
//!
//! One tokio task per sequencer owns the workflow context and the
//! `SequencerState`. Triggers, availability signals and call completions
//! all arrive as commands on one channel and are handled strictly in order,
//! so `advance` is never re-entered while it runs.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tw_backend::BackendStatus;
use tw_core::error::{BackendError, BackendResult, TwError, TwResult};

use crate::event_bus::{AppEvent, EventBus};

use super::state::{Advance, OfflineOutcome, SequencerSnapshot, SequencerState};
use super::step::{Apply, Step, StepKey};

/// What to do after a step failed with an error other than `TransientOffline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Keep the step in flight; the pipeline waits for a reset or reload.
    Stall,
    /// Treat the step as completed without a result and continue.
    Skip,
    /// Drop every incomplete requested step. No terminal action runs.
    Abort,
}

/// The context a sequencer drives: step results, pending input, observer.
pub trait Workflow: Send + 'static {
    type Step: StepKey;

    /// Name used in logs and events.
    fn name(&self) -> &'static str;

    /// Called once per failed activation with the failing step.
    fn on_step_error(&mut self, step: Self::Step, error: &BackendError) -> ErrorDisposition;

    /// Terminal action, run when every eligible requested step completed.
    fn on_finished(&mut self);

    /// Steps to request after `step` completed and its result was applied.
    fn after_step(&mut self, step: Self::Step) -> Vec<Self::Step> {
        let _ = step;
        Vec::new()
    }
}

type Update<W> = Box<dyn FnOnce(&mut W) -> Vec<<W as Workflow>::Step> + Send>;

enum Command<W: Workflow> {
    RequestSteps(Vec<W::Step>),
    Reset(Vec<W::Step>),
    Advance,
    SetReady(bool),
    Online,
    Offline,
    Update(Update<W>),
    StepFinished {
        step: W::Step,
        generation: u64,
        result: BackendResult<Apply<W>>,
    },
    Snapshot(oneshot::Sender<SequencerSnapshot<W::Step>>),
    Dispose,
}

/// A sequencer before it is spawned.
pub struct Sequencer<W: Workflow> {
    workflow: W,
    steps: Vec<Step<W>>,
    state: SequencerState<W::Step>,
    events: Option<EventBus>,
}

impl<W: Workflow> Sequencer<W> {
    /// Declare the steps of `workflow`. Their order is the execution order.
    pub fn new(workflow: W, steps: Vec<Step<W>>) -> Self {
        let state = SequencerState::new(steps.iter().map(Step::id));
        Self {
            workflow,
            steps,
            state,
            events: None,
        }
    }

    /// Publish step events on `bus`.
    pub fn with_events(mut self, bus: Option<EventBus>) -> Self {
        self.events = bus;
        self
    }

    /// Start with the ready flag already set.
    pub fn ready(mut self, ready: bool) -> Self {
        self.state.set_ready(ready);
        self
    }

    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(self) -> SequencerHandle<W> {
        let (tx, rx) = mpsc::unbounded_channel();
        let weak = tx.downgrade();
        tokio::spawn(self.run(rx, weak));
        SequencerHandle { tx }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<Command<W>>, tx: WeakUnboundedSender<Command<W>>) {
        let name = self.workflow.name();
        debug!("sequencer {name} started");

        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Dispose) {
                break;
            }
            self.handle(command);
            self.drive(&tx);
        }

        rx.close();
        self.emit(|workflow| AppEvent::WorkflowDisposed { workflow });
        debug!("sequencer {name} stopped");
    }

    fn handle(&mut self, command: Command<W>) {
        match command {
            Command::RequestSteps(steps) => {
                self.state.request_steps(steps);
            }
            Command::Reset(steps) => self.state.reset(steps),
            Command::Advance | Command::Dispose => {}
            Command::SetReady(ready) => self.state.set_ready(ready),
            Command::Online => {
                let restarted = self.state.online();
                if !restarted.is_empty() {
                    info!("{}: backend online, restarting {restarted:?}", self.workflow.name());
                }
            }
            Command::Offline => self.state.offline(),
            Command::Update(update) => {
                let steps = update(&mut self.workflow);
                self.state.request_steps(steps);
            }
            Command::StepFinished {
                step,
                generation,
                result,
            } => self.finish_step(step, generation, result),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn finish_step(&mut self, step: W::Step, generation: u64, result: BackendResult<Apply<W>>) {
        let name = self.workflow.name();
        match result {
            Ok(apply) => {
                if !self.state.complete(step, generation) {
                    debug!("{name}: dropping stale completion of {step:?}");
                    return;
                }
                apply(&mut self.workflow);
                self.emit_step(step, |workflow, step| AppEvent::StepCompleted { workflow, step });
                let follow_up = self.workflow.after_step(step);
                self.state.request_steps(follow_up);
            }
            Err(BackendError::TransientOffline) => match self.state.stall_offline(step, generation) {
                OfflineOutcome::Parked => {
                    info!("{name}: {step:?} stalled, backend offline");
                    self.emit_step(step, |workflow, step| AppEvent::StepStalled { workflow, step });
                }
                OfflineOutcome::Retry => info!("{name}: {step:?} hit an offline backend that is back, retrying"),
                OfflineOutcome::Stale => debug!("{name}: dropping stale offline result of {step:?}"),
            },
            Err(error) => {
                if !self.state.is_current(step, generation) {
                    debug!("{name}: dropping stale failure of {step:?}: {error}");
                    return;
                }
                warn!("{name}: {step:?} failed: {error}");
                self.emit_step(step, |workflow, step| AppEvent::StepFailed {
                    workflow,
                    step,
                    code: error.code(),
                    error: error.to_string(),
                });
                match self.workflow.on_step_error(step, &error) {
                    ErrorDisposition::Stall => {}
                    ErrorDisposition::Skip => {
                        self.state.complete(step, generation);
                    }
                    ErrorDisposition::Abort => self.state.abort(),
                }
            }
        }
    }

    /// Run one advance pass and act on it.
    fn drive(&mut self, tx: &WeakUnboundedSender<Command<W>>) {
        let steps = &self.steps;
        let workflow = &self.workflow;
        let outcome = self.state.advance(|id| {
            steps
                .iter()
                .find(|step| step.id() == id)
                .map_or(false, |step| step.is_eligible(workflow))
        });

        match outcome {
            Advance::Start { step, generation } => self.start(step, generation, tx),
            Advance::Finished => {
                debug!("{}: finished", self.workflow.name());
                self.emit(|workflow| AppEvent::WorkflowFinished { workflow });
                self.workflow.on_finished();
            }
            Advance::Waiting(_) | Advance::Idle | Advance::NotReady => {}
        }
    }

    fn start(&mut self, step: W::Step, generation: u64, tx: &WeakUnboundedSender<Command<W>>) {
        let Some(sender) = tx.upgrade() else {
            debug!("{}: no handle left, not starting {step:?}", self.workflow.name());
            return;
        };
        let Some(declared) = self.steps.iter().find(|s| s.id() == step) else {
            return;
        };

        debug!("{}: starting {step:?}", self.workflow.name());
        let call = declared.start(&self.workflow);
        self.emit_step(step, |workflow, step| AppEvent::StepStarted { workflow, step });

        tokio::spawn(async move {
            let result = call.await;
            // The actor may be gone; late completions are dropped.
            let _ = sender.send(Command::StepFinished {
                step,
                generation,
                result,
            });
        });
    }

    fn emit(&self, event: impl FnOnce(String) -> AppEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event(self.workflow.name().to_string()));
        }
    }

    fn emit_step(&self, step: W::Step, event: impl FnOnce(String, String) -> AppEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event(self.workflow.name().to_string(), format!("{step:?}")));
        }
    }
}

/// Cloneable front end of a running sequencer.
///
/// Every method is fire-and-forget except `snapshot`. Once the sequencer is
/// disposed, commands are silently dropped.
pub struct SequencerHandle<W: Workflow> {
    tx: UnboundedSender<Command<W>>,
}

impl<W: Workflow> Clone for SequencerHandle<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<W: Workflow> SequencerHandle<W> {
    fn send(&self, command: Command<W>) {
        if self.tx.send(command).is_err() {
            debug!("sequencer disposed, dropping command");
        }
    }

    /// Add steps to the work set and advance.
    pub fn request_steps(&self, steps: impl IntoIterator<Item = W::Step>) {
        let steps: Vec<_> = steps.into_iter().collect();
        if steps.is_empty() {
            return;
        }
        self.send(Command::RequestSteps(steps));
    }

    /// Force steps back to not started, then advance.
    pub fn reset(&self, steps: impl IntoIterator<Item = W::Step>) {
        self.send(Command::Reset(steps.into_iter().collect()));
    }

    pub fn advance(&self) {
        self.send(Command::Advance);
    }

    pub fn set_ready(&self, ready: bool) {
        self.send(Command::SetReady(ready));
    }

    /// Signal that the backend is reachable again.
    pub fn online(&self) {
        self.send(Command::Online);
    }

    /// Signal that the backend went away. Offline results received after
    /// this park until the next `online`.
    pub fn offline(&self) {
        self.send(Command::Offline);
    }

    /// Mutate the context on the actor, request the returned steps and advance.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut W) -> Vec<W::Step> + Send + 'static,
    {
        self.send(Command::Update(Box::new(f)));
    }

    /// Current state, after every command sent before this call.
    pub async fn snapshot(&self) -> TwResult<SequencerSnapshot<W::Step>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply_tx))
            .map_err(|_| TwError::Disposed("sequencer".into()))?;
        reply_rx
            .await
            .map_err(|_| TwError::Disposed("sequencer".into()))
    }

    /// Stop the actor. Pending completions are dropped.
    pub fn dispose(&self) {
        self.send(Command::Dispose);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Follow backend availability: `Online` sets ready and sends the online
    /// signal, `Offline` sends the offline signal, `NotReady` also clears
    /// ready. The task ends with the sequencer.
    pub fn follow(&self, mut status: watch::Receiver<BackendStatus>) -> JoinHandle<()> {
        let weak = self.tx.downgrade();
        tokio::spawn(async move {
            loop {
                let current = *status.borrow_and_update();
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                let delivered = match current {
                    BackendStatus::Online => {
                        tx.send(Command::SetReady(true)).is_ok() && tx.send(Command::Online).is_ok()
                    }
                    BackendStatus::NotReady => {
                        tx.send(Command::SetReady(false)).is_ok() && tx.send(Command::Offline).is_ok()
                    }
                    BackendStatus::Offline => tx.send(Command::Offline).is_ok(),
                };
                drop(tx);
                if !delivered || status.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
