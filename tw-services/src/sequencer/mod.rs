//! Generic asynchronous step sequencer.
//!
//! A sequencer drives a declared pipeline of backend calls to completion.
//! It is split in three layers:
//! - `step`: step declarations (identifier, guard, backend call)
//! - `state`: the pure state machine over step statuses and the work set
//! - `engine`: the actor owning a workflow context and its state, fed by
//!   typed commands from `SequencerHandle`s and call completions
//!
//! Steps run strictly one at a time in declared order. A step whose call
//! reports `TransientOffline` stays in flight until the online signal.

pub mod engine;
pub mod state;
pub mod step;

pub use engine::{ErrorDisposition, Sequencer, SequencerHandle, Workflow};
pub use state::{Advance, OfflineOutcome, SequencerSnapshot, SequencerState, StepStatus};
pub use step::{apply, Apply, Step, StepFuture, StepKey};
