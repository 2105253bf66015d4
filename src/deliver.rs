//! Hands outcomes back to the context that submitted the command.
//!
//! The caller owns a [`CallerLoop`] and pumps it from its own thread. Workers
//! only ever post completions to it through a [`CallerContext`], so callbacks
//! never run on the worker.

use tokio::sync::mpsc;

use crate::outcome::Outcome;

type Callback = Box<dyn FnOnce(Outcome) + Send>;

struct Delivery {
    outcome: Outcome,
    callback: Callback,
}

impl Delivery {
    fn run(self) {
        (self.callback)(self.outcome);
    }
}

/// Caller-side queue of completed commands.
pub struct CallerLoop {
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Default for CallerLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl CallerLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// A handle workers use to post completions back to this loop.
    pub fn context(&self) -> CallerContext {
        CallerContext {
            sender: self.sender.clone(),
        }
    }

    /// Run every completion delivered so far, in arrival order. Never blocks.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(delivery) = self.receiver.try_recv() {
            delivery.run();
            ran += 1;
        }
        ran
    }

    /// Block the current thread until one completion arrives, then run it.
    ///
    /// Must not be called from inside an async runtime; use [`run_next`](Self::run_next) there.
    pub fn blocking_run_next(&mut self) {
        if let Some(delivery) = self.receiver.blocking_recv() {
            delivery.run();
        }
    }

    /// Wait for one completion and run it.
    pub async fn run_next(&mut self) {
        if let Some(delivery) = self.receiver.recv().await {
            delivery.run();
        }
    }
}

/// Cloneable address of a [`CallerLoop`].
#[derive(Clone)]
pub struct CallerContext {
    sender: mpsc::UnboundedSender<Delivery>,
}

impl CallerContext {
    /// Post `outcome` for `callback` to run on the caller's loop.
    pub fn deliver<C>(&self, outcome: Outcome, callback: C)
    where
        C: FnOnce(Outcome) + Send + 'static,
    {
        let delivery = Delivery {
            outcome,
            callback: Box::new(callback),
        };
        if self.sender.send(delivery).is_err() {
            tracing::warn!("caller loop is gone, dropping outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use super::*;
    use crate::outcome::Payload;

    #[test]
    fn test_callbacks_run_on_pumping_thread() {
        let mut caller = CallerLoop::new();
        let context = caller.context();
        let seen = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        thread::spawn(move || {
            context.deliver(Outcome::empty(), move |_| {
                *sink.lock().unwrap() = Some(thread::current().id());
            });
        })
        .join()
        .unwrap();

        caller.blocking_run_next();
        assert_eq!(*seen.lock().unwrap(), Some(thread::current().id()));
    }

    #[test]
    fn test_deliveries_run_in_order() {
        let mut caller = CallerLoop::new();
        let context = caller.context();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            context.deliver(Outcome::Success(Payload::Bool(i % 2 == 0)), move |_| {
                order.lock().unwrap().push(i);
            });
        }

        assert_eq!(caller.run_pending(), 5);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_nothing_runs_until_pumped() {
        let caller = CallerLoop::new();
        let context = caller.context();
        let ran = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&ran);
        context.deliver(Outcome::empty(), move |_| *flag.lock().unwrap() = true);
        assert!(!*ran.lock().unwrap());

        let mut caller = caller;
        caller.run_pending();
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_deliver_after_loop_dropped_is_harmless() {
        let caller = CallerLoop::new();
        let context = caller.context();
        drop(caller);
        context.deliver(Outcome::NotImplemented, |_| panic!("must not run"));
    }
}
