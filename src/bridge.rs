use secrecy::SecretString;
use tokio::sync::oneshot;

use crate::command::Command;
use crate::deliver::CallerContext;
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::executor::CommandExecutor;
use crate::options::Options;
use crate::outcome::{ErrorCode, Outcome, OutcomeError};
use crate::store::SecureStore;

const WORKER_NAME: &str = "keybridge-worker";

/// Completion of one submitted command.
pub type Reply = oneshot::Receiver<Outcome>;

/// Entry point for a host application.
///
/// Every command is queued on one worker thread that owns the store, so
/// commands run one at a time in submission order. Results come back either
/// on the caller's [`CallerLoop`](crate::deliver::CallerLoop) or through a
/// per-command [`Reply`] channel.
pub struct SecureStorageBridge {
    executor: CommandExecutor<Dispatcher>,
}

impl SecureStorageBridge {
    pub fn start(store: Box<dyn SecureStore>) -> Result<Self, BridgeError> {
        let executor = CommandExecutor::spawn(WORKER_NAME, Dispatcher::new(store))?;
        tracing::debug!("bridge started");
        Ok(Self { executor })
    }

    /// Queue `command`; `on_complete` runs on `caller`'s loop once it resolves.
    pub fn submit<C>(
        &self,
        command: Command,
        caller: &CallerContext,
        on_complete: C,
    ) -> Result<(), BridgeError>
    where
        C: FnOnce(Outcome) + Send + 'static,
    {
        let caller = caller.clone();
        let label = command.method.to_string();
        self.executor.submit(
            label,
            move |dispatcher: &mut Dispatcher| dispatcher.handle(&command),
            move |outcome| caller.deliver(outcome, on_complete),
        )
    }

    /// Queue `command` and return a channel that yields its outcome.
    pub fn call(&self, command: Command) -> Result<Reply, BridgeError> {
        let (tx, rx) = oneshot::channel();
        let label = command.method.to_string();
        self.executor.submit(
            label,
            move |dispatcher: &mut Dispatcher| dispatcher.handle(&command),
            move |outcome| {
                // The receiver may have been dropped; nobody is waiting then.
                let _ = tx.send(outcome);
            },
        )?;
        Ok(rx)
    }

    /// Generic entry: a method name plus a JSON argument object.
    ///
    /// Arguments that fail to decode still go through the queue, so the error
    /// arrives in order with the caller's other results.
    pub fn invoke<C>(
        &self,
        method: &str,
        arguments: serde_json::Value,
        caller: &CallerContext,
        on_complete: C,
    ) -> Result<(), BridgeError>
    where
        C: FnOnce(Outcome) + Send + 'static,
    {
        match Command::from_json(method, arguments) {
            Ok(command) => self.submit(command, caller, on_complete),
            Err(e) => {
                let caller = caller.clone();
                let error = OutcomeError {
                    code: ErrorCode::InvalidArgument,
                    message: Some(method.to_string()),
                    details: Some(e.to_string()),
                };
                self.executor.submit(
                    method,
                    move |_: &mut Dispatcher| Outcome::failure(error),
                    move |outcome| caller.deliver(outcome, on_complete),
                )
            }
        }
    }

    pub fn write(
        &self,
        key: impl Into<String>,
        value: Option<SecretString>,
        options: Options,
    ) -> Result<Reply, BridgeError> {
        self.call(Command::write(key, value, options))
    }

    pub fn read(&self, key: impl Into<String>, options: Options) -> Result<Reply, BridgeError> {
        self.call(Command::read(key, options))
    }

    pub fn read_all(&self, options: Options) -> Result<Reply, BridgeError> {
        self.call(Command::read_all(options))
    }

    pub fn contains_key(
        &self,
        key: impl Into<String>,
        options: Options,
    ) -> Result<Reply, BridgeError> {
        self.call(Command::contains_key(key, options))
    }

    pub fn delete(&self, key: impl Into<String>, options: Options) -> Result<Reply, BridgeError> {
        self.call(Command::delete(key, options))
    }

    pub fn delete_all(&self, options: Options) -> Result<Reply, BridgeError> {
        self.call(Command::delete_all(options))
    }

    /// Finish queued commands and stop the worker. Later submissions fail with `Closed`.
    pub fn shutdown(&self) {
        self.executor.shutdown();
        tracing::debug!("bridge shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }
}
