//! Sequencer behaviour against a scripted workflow.
//!
//! Every backend call is handed to the test over a channel together with a
//! reply sender, so each test decides when and how each call completes.

mod common;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use tw_backend::{BackendStatus, Connectivity};
use tw_core::error::{BackendError, BackendResult, ErrorKind, TwError};
use tw_services::sequencer::{apply, ErrorDisposition, Sequencer, SequencerHandle, Step, StepStatus, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Key {
    FetchContainer,
    FetchEntity,
    Bind,
    UpdateName,
}

#[derive(Debug, PartialEq)]
enum Event {
    Applied(Key, u32),
    Error(Key, BackendError),
    NotFound,
    Finished,
}

type Reply = oneshot::Sender<BackendResult<u32>>;

struct ScriptFlow {
    events: mpsc::UnboundedSender<Event>,
    container: Option<u32>,
    entity: Option<u32>,
    disposition: ErrorDisposition,
}

impl Workflow for ScriptFlow {
    type Step = Key;

    fn name(&self) -> &'static str {
        "script"
    }

    fn on_step_error(&mut self, step: Key, error: &BackendError) -> ErrorDisposition {
        if error.is_not_found() {
            let _ = self.events.send(Event::NotFound);
            return ErrorDisposition::Abort;
        }
        let _ = self.events.send(Event::Error(step, error.clone()));
        self.disposition
    }

    fn on_finished(&mut self) {
        let _ = self.events.send(Event::Finished);
    }
}

fn scripted(id: Key, calls: &mpsc::UnboundedSender<(Key, Reply)>) -> Step<ScriptFlow> {
    let calls = calls.clone();
    Step::new(id, move |_flow: &ScriptFlow| {
        let calls = calls.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            let _ = calls.send((id, tx));
            let value = rx
                .await
                .map_err(|_| BackendError::other(ErrorKind::Internal, "reply dropped"))??;
            Ok::<_, BackendError>(apply(move |flow: &mut ScriptFlow| {
                match id {
                    Key::FetchContainer => flow.container = Some(value),
                    Key::FetchEntity => flow.entity = Some(value),
                    _ => {}
                }
                let _ = flow.events.send(Event::Applied(id, value));
            }))
        }
    })
}

struct Harness {
    handle: SequencerHandle<ScriptFlow>,
    calls: mpsc::UnboundedReceiver<(Key, Reply)>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    fn new(disposition: ErrorDisposition, ready: bool) -> Self {
        let (calls_tx, calls) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let flow = ScriptFlow {
            events: events_tx,
            container: None,
            entity: None,
            disposition,
        };
        let steps = vec![
            scripted(Key::FetchContainer, &calls_tx),
            scripted(Key::FetchEntity, &calls_tx).guarded(|flow| flow.container.is_some()),
            scripted(Key::Bind, &calls_tx).guarded(|flow| flow.entity.is_some()),
            scripted(Key::UpdateName, &calls_tx),
        ];
        let handle = Sequencer::new(flow, steps).ready(ready).spawn();
        Self {
            handle,
            calls,
            events,
        }
    }

    fn online() -> Self {
        Self::new(ErrorDisposition::Abort, true)
    }

    async fn next_call(&mut self) -> (Key, Reply) {
        timeout(common::WAIT, self.calls.recv())
            .await
            .expect("timed out waiting for a backend call")
            .expect("call channel closed")
    }

    async fn expect_call(&mut self, expected: Key) -> Reply {
        let (key, reply) = self.next_call().await;
        assert_eq!(key, expected);
        reply
    }

    async fn next_event(&mut self) -> Event {
        timeout(common::WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a workflow event")
            .expect("event channel closed")
    }

    async fn assert_no_call(&mut self) {
        tokio::time::sleep(common::QUIET).await;
        if let Ok((key, _)) = self.calls.try_recv() {
            panic!("unexpected call to {key:?}");
        }
    }

    async fn assert_no_event(&mut self) {
        tokio::time::sleep(common::QUIET).await;
        if let Ok(event) = self.events.try_recv() {
            panic!("unexpected event {event:?}");
        }
    }

    /// Answer the next three calls of the fetch/bind pipeline.
    async fn run_pipeline(&mut self) {
        for (key, value) in [(Key::FetchContainer, 1), (Key::FetchEntity, 2), (Key::Bind, 3)] {
            let reply = self.expect_call(key).await;
            let _ = reply.send(Ok(value));
            assert_eq!(self.next_event().await, Event::Applied(key, value));
        }
    }
}

fn pipeline() -> Vec<Key> {
    vec![Key::FetchContainer, Key::FetchEntity, Key::Bind]
}

// ---- Ordering and termination ----

#[tokio::test]
async fn steps_run_in_declared_order_and_finish_once() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::Bind, Key::FetchEntity, Key::FetchContainer]);

    h.run_pipeline().await;
    assert_eq!(h.next_event().await, Event::Finished);
    h.assert_no_event().await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.finished);
    assert_eq!(snapshot.status_of(Key::Bind), Some(StepStatus::Completed));
    assert_eq!(snapshot.status_of(Key::UpdateName), Some(StepStatus::NotStarted));
}

#[tokio::test]
async fn one_step_in_flight_at_a_time() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::FetchContainer, Key::UpdateName]);

    let reply = h.expect_call(Key::FetchContainer).await;
    h.assert_no_call().await;
    assert_eq!(h.handle.snapshot().await.unwrap().started(), vec![Key::FetchContainer]);

    let _ = reply.send(Ok(1));
    let reply = h.expect_call(Key::UpdateName).await;
    let _ = reply.send(Ok(7));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchContainer, 1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 7));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn earlier_step_requested_mid_flight_waits_its_turn() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let reply = h.expect_call(Key::UpdateName).await;

    // FetchContainer is declared first but UpdateName is already running.
    h.handle.request_steps([Key::FetchContainer]);
    h.assert_no_call().await;
    assert_eq!(h.handle.snapshot().await.unwrap().started(), vec![Key::UpdateName]);

    let _ = reply.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    let _ = h.expect_call(Key::FetchContainer).await.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchContainer, 2));
    assert_eq!(h.next_event().await, Event::Finished);
    h.assert_no_call().await;
}

#[tokio::test]
async fn advance_without_work_is_idempotent() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    assert_eq!(h.next_event().await, Event::Finished);

    h.handle.advance();
    h.handle.advance();
    h.assert_no_call().await;
    h.assert_no_event().await;
}

#[tokio::test]
async fn completed_step_requested_again_runs_again() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    assert_eq!(h.next_event().await, Event::Finished);

    h.handle.request_steps([Key::UpdateName]);
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 2));
    assert_eq!(h.next_event().await, Event::Finished);
}

// ---- Guards and readiness ----

#[tokio::test]
async fn guarded_step_waits_for_its_input() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::Bind]);

    // Bind's guard needs an entity: nothing eligible, the run is over.
    assert_eq!(h.next_event().await, Event::Finished);
    h.assert_no_call().await;

    h.handle.update(|flow| {
        flow.entity = Some(9);
        Vec::new()
    });
    let _ = h.expect_call(Key::Bind).await.send(Ok(3));
    assert_eq!(h.next_event().await, Event::Applied(Key::Bind, 3));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn nothing_runs_until_ready() {
    let mut h = Harness::new(ErrorDisposition::Abort, false);
    h.handle.request_steps(pipeline());
    h.assert_no_call().await;
    h.assert_no_event().await;
    assert!(!h.handle.snapshot().await.unwrap().ready);

    h.handle.set_ready(true);
    h.run_pipeline().await;
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn follower_sets_ready_when_backend_comes_online() {
    let mut h = Harness::new(ErrorDisposition::Abort, false);
    let connectivity = Connectivity::new(BackendStatus::NotReady);
    let follower = h.handle.follow(connectivity.subscribe());

    h.handle.request_steps([Key::UpdateName]);
    h.assert_no_call().await;

    connectivity.set_online();
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    assert_eq!(h.next_event().await, Event::Finished);

    h.handle.dispose();
    drop(connectivity);
    timeout(common::WAIT, follower)
        .await
        .expect("follower did not stop with the sequencer")
        .unwrap();
}

// ---- Scenario A-D ----

#[tokio::test]
async fn fetch_fetch_bind_completes_without_errors() {
    let mut h = Harness::online();
    h.handle.request_steps(pipeline());

    h.run_pipeline().await;
    assert_eq!(h.next_event().await, Event::Finished);
    h.assert_no_event().await;
}

#[tokio::test]
async fn offline_result_stalls_until_online_signal() {
    let mut h = Harness::online();
    h.handle.request_steps(pipeline());

    let _ = h.expect_call(Key::FetchContainer).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchContainer, 1));
    let _ = h
        .expect_call(Key::FetchEntity)
        .await
        .send(Err(BackendError::TransientOffline));

    // Silent stall: no error, no completion, no retry on its own.
    h.assert_no_event().await;
    h.assert_no_call().await;
    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.restart_requested);
    assert_eq!(snapshot.status_of(Key::FetchEntity), Some(StepStatus::Started));
    assert_eq!(snapshot.status_of(Key::Bind), Some(StepStatus::NotStarted));

    h.handle.online();
    let _ = h.expect_call(Key::FetchEntity).await.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchEntity, 2));
    let _ = h.expect_call(Key::Bind).await.send(Ok(3));
    assert_eq!(h.next_event().await, Event::Applied(Key::Bind, 3));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn reconnect_before_the_offline_result_retries_immediately() {
    let mut h = Harness::new(ErrorDisposition::Abort, false);
    let connectivity = Connectivity::new(BackendStatus::Online);
    let _follower = h.handle.follow(connectivity.subscribe());

    h.handle.request_steps([Key::UpdateName]);
    let reply = h.expect_call(Key::UpdateName).await;

    connectivity.set_offline();
    tokio::time::sleep(common::QUIET).await;
    assert!(!h.handle.snapshot().await.unwrap().backend_online);
    connectivity.set_online();
    tokio::time::sleep(common::QUIET).await;
    assert!(h.handle.snapshot().await.unwrap().backend_online);

    // The offline result lands after the online signal was consumed.
    let _ = reply.send(Err(BackendError::TransientOffline));
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 2));
    assert_eq!(h.next_event().await, Event::Finished);

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(!snapshot.restart_requested);
    assert_eq!(snapshot.status_of(Key::UpdateName), Some(StepStatus::Completed));
}

#[tokio::test]
async fn followed_offline_signal_parks_offline_results() {
    let mut h = Harness::new(ErrorDisposition::Abort, false);
    let connectivity = Connectivity::new(BackendStatus::Online);
    let _follower = h.handle.follow(connectivity.subscribe());

    h.handle.request_steps([Key::UpdateName]);
    let reply = h.expect_call(Key::UpdateName).await;
    connectivity.set_offline();
    tokio::time::sleep(common::QUIET).await;

    let _ = reply.send(Err(BackendError::TransientOffline));
    h.assert_no_call().await;
    assert!(h.handle.snapshot().await.unwrap().restart_requested);

    connectivity.set_online();
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(3));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 3));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn online_signal_without_stall_changes_nothing() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let reply = h.expect_call(Key::UpdateName).await;

    h.handle.online();
    h.assert_no_call().await;

    let _ = reply.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn not_found_is_reported_once_and_bind_never_starts() {
    let mut h = Harness::online();
    h.handle.request_steps(pipeline());

    let _ = h.expect_call(Key::FetchContainer).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchContainer, 1));
    let _ = h
        .expect_call(Key::FetchEntity)
        .await
        .send(Err(BackendError::not_found("entity 2")));

    assert_eq!(h.next_event().await, Event::NotFound);
    h.assert_no_call().await;
    h.assert_no_event().await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status_of(Key::Bind), Some(StepStatus::NotStarted));
    assert_eq!(snapshot.status_of(Key::FetchContainer), Some(StepStatus::Completed));
    assert_eq!(snapshot.work, vec![Key::FetchContainer]);
}

#[tokio::test]
async fn request_while_in_flight_issues_one_call() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    h.handle.request_steps([Key::UpdateName]);

    let reply = h.expect_call(Key::UpdateName).await;
    h.handle.request_steps([Key::UpdateName]);
    h.assert_no_call().await;

    let _ = reply.send(Ok(5));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 5));
    assert_eq!(h.next_event().await, Event::Finished);
    h.assert_no_call().await;
}

// ---- Error dispositions ----

#[tokio::test]
async fn abort_drops_incomplete_work_without_finishing() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::FetchContainer, Key::UpdateName]);

    let failure = BackendError::other(ErrorKind::NoPermission, "denied");
    let _ = h.expect_call(Key::FetchContainer).await.send(Err(failure.clone()));
    assert_eq!(h.next_event().await, Event::Error(Key::FetchContainer, failure));
    h.assert_no_call().await;
    h.assert_no_event().await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.work.is_empty());
    assert_eq!(snapshot.status_of(Key::FetchContainer), Some(StepStatus::NotStarted));

    // The sequencer stays usable.
    h.handle.request_steps([Key::UpdateName]);
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 1));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn skip_continues_with_the_next_step() {
    let mut h = Harness::new(ErrorDisposition::Skip, true);
    h.handle.request_steps([Key::FetchContainer, Key::UpdateName]);

    let failure = BackendError::other(ErrorKind::Storage, "disk");
    let _ = h.expect_call(Key::FetchContainer).await.send(Err(failure.clone()));
    assert_eq!(h.next_event().await, Event::Error(Key::FetchContainer, failure));

    let _ = h.expect_call(Key::UpdateName).await.send(Ok(4));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 4));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn stall_keeps_the_step_in_flight() {
    let mut h = Harness::new(ErrorDisposition::Stall, true);
    h.handle.request_steps([Key::FetchContainer, Key::UpdateName]);

    let failure = BackendError::other(ErrorKind::LimitReached, "quota");
    let _ = h.expect_call(Key::FetchContainer).await.send(Err(failure.clone()));
    assert_eq!(h.next_event().await, Event::Error(Key::FetchContainer, failure));
    h.assert_no_call().await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.started(), vec![Key::FetchContainer]);
    assert!(!snapshot.finished);

    h.handle.reset([Key::FetchContainer]);
    let _ = h.expect_call(Key::FetchContainer).await.send(Ok(1));
    assert_eq!(h.next_event().await, Event::Applied(Key::FetchContainer, 1));
    let _ = h.expect_call(Key::UpdateName).await.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 2));
    assert_eq!(h.next_event().await, Event::Finished);
}

// ---- Reset and dispose ----

#[tokio::test]
async fn reset_in_flight_drops_the_stale_completion() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let stale = h.expect_call(Key::UpdateName).await;

    h.handle.reset([Key::UpdateName]);
    let fresh = h.expect_call(Key::UpdateName).await;

    let _ = stale.send(Ok(1));
    h.assert_no_event().await;

    let _ = fresh.send(Ok(2));
    assert_eq!(h.next_event().await, Event::Applied(Key::UpdateName, 2));
    assert_eq!(h.next_event().await, Event::Finished);
}

#[tokio::test]
async fn nothing_is_delivered_after_dispose() {
    let mut h = Harness::online();
    h.handle.request_steps([Key::UpdateName]);
    let reply = h.expect_call(Key::UpdateName).await;

    h.handle.dispose();
    let _ = reply.send(Ok(1));

    // The workflow is dropped with the actor: the event channel closes
    // without anything having been applied.
    let closed = timeout(common::WAIT, h.events.recv())
        .await
        .expect("sequencer did not stop");
    assert_eq!(closed, None);

    h.handle.request_steps([Key::UpdateName]);
    h.assert_no_call().await;
    assert!(h.handle.is_closed());
    assert!(matches!(h.handle.snapshot().await, Err(TwError::Disposed(_))));
}

#[tokio::test]
async fn dropping_every_handle_stops_the_sequencer() {
    let Harness {
        handle,
        calls: _calls,
        mut events,
    } = Harness::online();
    drop(handle);

    let closed = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("sequencer did not stop");
    assert_eq!(closed, None);
}
