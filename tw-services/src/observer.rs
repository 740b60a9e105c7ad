//! Observer plumbing shared by every controller.
//!
//! An `ObserverSlot` holds the UI sink of one controller. Deliveries are
//! queued to the UI thread and look the observer up again when they run, so
//! a delivery still waiting in the queue at `detach` reaches nobody.

use std::sync::{Arc, PoisonError, RwLock};

use tw_core::error::BackendError;

use crate::ui::UiHandle;

/// Callbacks every controller observer understands.
pub trait ProgressObserver: Send + Sync {
    /// A workflow run started.
    fn show_progress(&self) {}

    /// Every requested step completed.
    fn hide_progress(&self) {}

    /// A step failed with an error the controller does not map itself.
    fn on_error(&self, step: &str, error: &BackendError) {
        let _ = (step, error);
    }
}

/// Detachable, UI-thread-bound observer reference.
pub struct ObserverSlot<O: ?Sized> {
    inner: Arc<RwLock<Option<Arc<O>>>>,
    ui: UiHandle,
}

impl<O: ?Sized> Clone for ObserverSlot<O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ui: self.ui.clone(),
        }
    }
}

impl<O: ?Sized + Send + Sync + 'static> ObserverSlot<O> {
    pub fn new(observer: Arc<O>, ui: UiHandle) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(observer))),
            ui,
        }
    }

    /// Deliver a callback on the UI thread if the observer is still attached.
    pub fn notify<F>(&self, f: F)
    where
        F: FnOnce(&O) + Send + 'static,
    {
        let inner = self.inner.clone();
        self.ui.run_on_ui_thread(move || {
            // Clone out so the lock is not held while the observer runs.
            let observer = inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(observer) = observer {
                f(&*observer);
            }
        });
    }

    /// Stop further deliveries, including ones already queued.
    ///
    /// A delivery the UI thread has already picked up when this runs may
    /// still reach the observer once. Call it from the UI thread to rule
    /// that out.
    pub fn detach(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_attached(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
