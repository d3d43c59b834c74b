//! Run handles and the in-process cancel registry.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};

use crate::event::OutboundEvent;

/// Consumer end of a running research task.
///
/// Events stop after the terminal `done`/`error`; [`RunRelay::next_event`]
/// then returns `None`.
pub struct RunRelay {
    rx: mpsc::Receiver<OutboundEvent>,
    cancel: CancelHandle,
}

impl RunRelay {
    pub(crate) fn new(rx: mpsc::Receiver<OutboundEvent>, cancel: CancelHandle) -> Self {
        Self { rx, cancel }
    }

    pub async fn next_event(&mut self) -> Option<OutboundEvent> {
        self.rx.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// Requests cancellation of a running task. Cloneable and idempotent.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Registry of in-flight runs keyed by upstream run id.
#[derive(Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<DashMap<String, CancelHandle>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, run_id: impl Into<String>, handle: CancelHandle) {
        self.inner.insert(run_id.into(), handle);
    }

    pub fn deregister(&self, run_id: &str) {
        self.inner.remove(run_id);
    }

    /// Cancel by run id. Returns false when the run is unknown or finished.
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.inner.get(run_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
