//! UI dispatch thread.
//!
//! Observer callbacks never run on the sequencer's runtime. They are queued
//! to a dedicated OS thread named `ui`, which runs them one at a time in
//! submission order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use tw_core::error::{TwError, TwResult};

/// Name of the UI thread.
pub const UI_THREAD_NAME: &str = "ui";

type UiTask = Box<dyn FnOnce() + Send>;

enum UiMessage {
    Run(UiTask),
    Flush(oneshot::Sender<()>),
}

/// Owner of the UI thread.
pub struct UiThread;

impl UiThread {
    /// Start the UI thread.
    ///
    /// The thread stops once every `UiHandle` is dropped and the queue is
    /// drained.
    pub fn spawn() -> TwResult<(UiHandle, JoinHandle<()>)> {
        let (tx, mut rx) = mpsc::unbounded_channel::<UiMessage>();

        let thread = std::thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("ui thread started");
                while let Some(message) = rx.blocking_recv() {
                    match message {
                        UiMessage::Run(task) => {
                            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                                error!("ui task panicked");
                            }
                        }
                        UiMessage::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("ui thread stopped");
            })?;

        Ok((UiHandle { tx }, thread))
    }
}

/// Sender side of the UI queue.
#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl UiHandle {
    /// Queue `f` to run on the UI thread. Fire and forget.
    pub fn run_on_ui_thread<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(UiMessage::Run(Box::new(f))).is_err() {
            debug!("ui thread stopped, dropping task");
        }
    }

    /// Wait until every task queued before this call has run.
    pub async fn flush(&self) -> TwResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(UiMessage::Flush(done_tx))
            .map_err(|_| TwError::Disposed("ui thread".into()))?;
        done_rx
            .await
            .map_err(|_| TwError::Disposed("ui thread".into()))
    }

    /// Whether the caller runs on the UI thread.
    pub fn is_ui_thread() -> bool {
        std::thread::current().name() == Some(UI_THREAD_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_tasks_run_in_order_on_ui_thread() {
        let (ui, thread) = UiThread::spawn().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            ui.run_on_ui_thread(move || {
                assert!(UiHandle::is_ui_thread());
                seen.lock().unwrap().push(i);
            });
        }
        ui.flush().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!UiHandle::is_ui_thread());

        drop(ui);
        thread.join().unwrap();
    }

    #[tokio::test]
    async fn test_panicking_task_keeps_thread_alive() {
        let (ui, _thread) = UiThread::spawn().unwrap();
        ui.run_on_ui_thread(|| panic!("boom"));
        let flag = Arc::new(Mutex::new(false));
        let flag2 = flag.clone();
        ui.run_on_ui_thread(move || *flag2.lock().unwrap() = true);
        ui.flush().await.unwrap();
        assert!(*flag.lock().unwrap());
    }
}
