//! Serialized command bridge over an encrypted key-value store.
//!
//! A [`SecureStorageBridge`] owns one worker thread and one [`SecureStore`].
//! Commands are queued and run strictly in order; each resolves exactly once
//! with an [`Outcome`], delivered on the caller's own [`CallerLoop`] or through
//! a per-command reply channel. With the `resetOnError` option a failing
//! namespace is wiped and the command retried once.

pub mod bridge;
pub mod command;
pub mod config;
pub mod deliver;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod logging;
pub mod options;
pub mod outcome;
pub mod retry;
pub mod store;

pub use bridge::{Reply, SecureStorageBridge};
pub use command::{CallArguments, Command, Method};
pub use deliver::{CallerContext, CallerLoop};
pub use error::{BridgeError, StoreError};
pub use options::{Options, StoreOptions};
pub use outcome::{ErrorCode, Outcome, OutcomeError, Payload};
pub use store::{EncryptedFileStore, MemoryStore, SecureStore, StoreState};
