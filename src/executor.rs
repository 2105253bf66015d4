//! Single-worker FIFO queue.
//!
//! All operations run on one dedicated thread that owns the worker state `S`.
//! Callers only enqueue; they never wait for an operation to finish.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::outcome::{Outcome, OutcomeError};

type Operation<S> = Box<dyn FnOnce(&mut S) -> Outcome + Send>;
type Completion = Box<dyn FnOnce(Outcome) + Send>;

/// A queued call's completion. Fires exactly once: explicitly after the
/// operation ran, or with a `closed` failure if the call is dropped unrun.
pub struct PendingCall {
    label: String,
    on_complete: Option<Completion>,
}

impl PendingCall {
    fn new(label: String, on_complete: Completion) -> Self {
        Self {
            label,
            on_complete: Some(on_complete),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn complete(mut self, outcome: Outcome) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(outcome);
        }
    }

    /// Drop without firing; used when the submission itself is rejected.
    fn abandon(mut self) {
        self.on_complete = None;
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            tracing::debug!(label = %self.label, "pending call dropped before running");
            on_complete(Outcome::failure(OutcomeError::closed()));
        }
    }
}

struct Job<S> {
    op: Operation<S>,
    pending: PendingCall,
}

pub struct CommandExecutor<S> {
    sender: Mutex<Option<mpsc::UnboundedSender<Job<S>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Send + 'static> CommandExecutor<S> {
    /// Start the worker thread, moving `state` onto it.
    pub fn spawn(name: &str, state: S) -> Result<Self, BridgeError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(state, receiver))
            .map_err(BridgeError::Spawn)?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueue `op`. `on_complete` later receives its outcome on the worker thread.
    pub fn submit<F, C>(
        &self,
        label: impl Into<String>,
        op: F,
        on_complete: C,
    ) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut S) -> Outcome + Send + 'static,
        C: FnOnce(Outcome) + Send + 'static,
    {
        let sender = lock(&self.sender);
        let Some(sender) = sender.as_ref() else {
            return Err(BridgeError::Closed);
        };

        let job = Job {
            op: Box::new(op),
            pending: PendingCall::new(label.into(), Box::new(on_complete)),
        };
        sender.send(job).map_err(|mpsc::error::SendError(job)| {
            job.pending.abandon();
            BridgeError::Closed
        })
    }
}

impl<S> CommandExecutor<S> {
    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }

    /// Stop accepting work, run everything already queued, and join the worker.
    pub fn shutdown(&self) {
        drop(lock(&self.sender).take());

        let Some(worker) = lock(&self.worker).take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Called from inside an operation; the loop ends on its own.
            return;
        }
        if worker.join().is_err() {
            tracing::error!("worker thread terminated abnormally");
        }
    }
}

impl<S> Drop for CommandExecutor<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<S>(mut state: S, mut receiver: mpsc::UnboundedReceiver<Job<S>>) {
    tracing::debug!("worker started");

    while let Some(Job { op, pending }) = receiver.blocking_recv() {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| op(&mut state))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let details = panic_message(&*payload);
                tracing::error!(label = %pending.label(), %details, "operation panicked");
                Outcome::failure(OutcomeError::panicked(pending.label(), details))
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(|| pending.complete(outcome))).is_err() {
            tracing::error!("completion callback panicked");
        }
    }

    tracing::debug!("worker drained, exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
