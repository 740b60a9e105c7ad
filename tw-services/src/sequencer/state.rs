//! Sequencer state machine.
//!
//! Pure bookkeeping with no I/O: which steps were requested, which are in
//! flight, which completed, and what `advance` should do next. The engine
//! owns one `SequencerState` and is the only caller.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::step::StepKey;

/// Progress of one step in the current activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    NotStarted,
    /// Call issued, completion pending.
    Started,
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct StepSlot {
    status: StepStatus,
    /// Bumped each time the step starts; completions carry it back.
    generation: u64,
}

/// Outcome of one `advance` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance<S> {
    /// The backend is not ready; nothing was inspected.
    NotReady,
    /// `step` was marked started and its call must be issued.
    Start { step: S, generation: u64 },
    /// `step` is in flight.
    Waiting(S),
    /// Every eligible requested step just completed. Reported once per run.
    Finished,
    /// Nothing to do.
    Idle,
}

/// What a `TransientOffline` result did to its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineOutcome {
    /// The activation was superseded; the result is dropped.
    Stale,
    /// The step stays started until the next online signal.
    Parked,
    /// The backend was already reported online again: the step goes back
    /// to `NotStarted` and the next advance reissues its call.
    Retry,
}

/// Point-in-time view of a sequencer, for inspection and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSnapshot<S> {
    /// Declared steps with their status, in declared order.
    pub steps: Vec<(S, StepStatus)>,
    /// Requested steps, in key order.
    pub work: Vec<S>,
    pub ready: bool,
    pub restart_requested: bool,
    /// Last availability signal: online since the last offline report.
    pub backend_online: bool,
    pub finished: bool,
}

impl<S: StepKey> SequencerSnapshot<S> {
    pub fn status_of(&self, step: S) -> Option<StepStatus> {
        self.steps.iter().find(|(id, _)| *id == step).map(|(_, status)| *status)
    }

    /// Steps currently in flight.
    pub fn started(&self) -> Vec<S> {
        self.steps
            .iter()
            .filter(|(_, status)| *status == StepStatus::Started)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Step statuses, work set and availability flags of one sequencer.
#[derive(Debug, Clone)]
pub struct SequencerState<S: StepKey> {
    order: Vec<S>,
    slots: BTreeMap<S, StepSlot>,
    work: BTreeSet<S>,
    ready: bool,
    restart_requested: bool,
    backend_online: bool,
    finished: bool,
}

impl<S: StepKey> SequencerState<S> {
    /// Create the state for steps declared in `order`. Duplicates are ignored.
    pub fn new(order: impl IntoIterator<Item = S>) -> Self {
        let mut slots = BTreeMap::new();
        let mut declared = Vec::new();
        for step in order {
            if slots.contains_key(&step) {
                warn!("step {step:?} declared twice, keeping the first declaration");
                continue;
            }
            slots.insert(
                step,
                StepSlot {
                    status: StepStatus::NotStarted,
                    generation: 0,
                },
            );
            declared.push(step);
        }
        Self {
            order: declared,
            slots,
            work: BTreeSet::new(),
            ready: false,
            restart_requested: false,
            backend_online: false,
            finished: true,
        }
    }

    /// Merge steps into the work set.
    ///
    /// Completed steps go back to `NotStarted` so they run again. Steps in
    /// flight are left alone; the running call stands for the new request.
    /// Returns whether anything changed.
    pub fn request_steps(&mut self, steps: impl IntoIterator<Item = S>) -> bool {
        let mut changed = false;
        for step in steps {
            let Some(slot) = self.slots.get_mut(&step) else {
                warn!("ignoring request for undeclared step {step:?}");
                continue;
            };
            if slot.status == StepStatus::Completed {
                slot.status = StepStatus::NotStarted;
                changed = true;
            }
            changed |= self.work.insert(step);
        }
        if changed {
            self.finished = false;
        }
        changed
    }

    /// Force steps back to `NotStarted`, including steps in flight.
    ///
    /// A completion still arriving for a reset step is dropped.
    pub fn reset(&mut self, steps: impl IntoIterator<Item = S>) {
        for step in steps {
            if let Some(slot) = self.slots.get_mut(&step) {
                slot.status = StepStatus::NotStarted;
                if self.work.contains(&step) {
                    self.finished = false;
                }
            }
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Walk the declared order and decide the next action.
    ///
    /// At most one step is in flight: while any step is started nothing else
    /// starts, whatever its position. `eligible` evaluates a step's guard.
    /// Only requested, eligible steps are considered; a step whose guard does
    /// not hold is passed over.
    pub fn advance(&mut self, eligible: impl Fn(S) -> bool) -> Advance<S> {
        if !self.ready {
            return Advance::NotReady;
        }
        if let Some(step) = self.in_flight() {
            return Advance::Waiting(step);
        }

        for &step in &self.order {
            if !self.work.contains(&step) || !eligible(step) {
                continue;
            }
            let Some(slot) = self.slots.get_mut(&step) else {
                continue;
            };
            match slot.status {
                StepStatus::NotStarted => {
                    slot.status = StepStatus::Started;
                    slot.generation += 1;
                    self.finished = false;
                    return Advance::Start {
                        step,
                        generation: slot.generation,
                    };
                }
                StepStatus::Started => return Advance::Waiting(step),
                StepStatus::Completed => continue,
            }
        }

        if self.finished {
            Advance::Idle
        } else {
            self.finished = true;
            Advance::Finished
        }
    }

    fn in_flight(&self) -> Option<S> {
        self.order.iter().copied().find(|step| {
            self.slots
                .get(step)
                .map_or(false, |slot| slot.status == StepStatus::Started)
        })
    }

    /// Whether `generation` is the live activation of a started step.
    pub fn is_current(&self, step: S, generation: u64) -> bool {
        self.slots
            .get(&step)
            .map_or(false, |slot| slot.status == StepStatus::Started && slot.generation == generation)
    }

    /// Mark a step completed. Returns false for stale or unknown activations.
    pub fn complete(&mut self, step: S, generation: u64) -> bool {
        if !self.is_current(step, generation) {
            return false;
        }
        if let Some(slot) = self.slots.get_mut(&step) {
            slot.status = StepStatus::Completed;
        }
        true
    }

    /// Record a `TransientOffline` result.
    ///
    /// Normally the step stays started and a restart is requested for the
    /// next online signal. If that signal already arrived while the call was
    /// in flight, no other one is coming, so the step is retried at once.
    pub fn stall_offline(&mut self, step: S, generation: u64) -> OfflineOutcome {
        if !self.is_current(step, generation) {
            return OfflineOutcome::Stale;
        }
        if self.backend_online {
            if let Some(slot) = self.slots.get_mut(&step) {
                slot.status = StepStatus::NotStarted;
            }
            return OfflineOutcome::Retry;
        }
        self.restart_requested = true;
        OfflineOutcome::Parked
    }

    /// Handle the online signal.
    ///
    /// Only restarts anything when an offline result requested it: every
    /// started step returns to `NotStarted` so the next advance reissues its
    /// call. Returns the restarted steps.
    pub fn online(&mut self) -> Vec<S> {
        self.backend_online = true;
        if !self.restart_requested {
            return Vec::new();
        }
        self.restart_requested = false;

        let mut restarted = Vec::new();
        for &step in &self.order {
            if let Some(slot) = self.slots.get_mut(&step) {
                if slot.status == StepStatus::Started {
                    slot.status = StepStatus::NotStarted;
                    restarted.push(step);
                }
            }
        }
        restarted
    }

    /// Handle the offline signal. Offline results park until `online`.
    pub fn offline(&mut self) {
        self.backend_online = false;
    }

    /// Drop every incomplete step from the work set. No terminal action
    /// follows; completed steps stay completed.
    pub fn abort(&mut self) {
        let slots = &mut self.slots;
        self.work.retain(|step| match slots.get_mut(step) {
            Some(slot) if slot.status == StepStatus::Completed => true,
            Some(slot) => {
                slot.status = StepStatus::NotStarted;
                false
            }
            None => false,
        });
        self.finished = true;
    }

    pub fn snapshot(&self) -> SequencerSnapshot<S> {
        SequencerSnapshot {
            steps: self
                .order
                .iter()
                .filter_map(|step| self.slots.get(step).map(|slot| (*step, slot.status)))
                .collect(),
            work: self.work.iter().copied().collect(),
            ready: self.ready,
            restart_requested: self.restart_requested,
            backend_online: self.backend_online,
            finished: self.finished,
        }
    }
}
