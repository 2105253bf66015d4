use thiserror::Error;

/// Failures raised by a [`SecureStore`](crate::store::SecureStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The namespace has never been written. Not a fault: callers treat it as empty.
    #[error("Namespace '{0}' has not been created yet.")]
    Uninitialized(String),

    #[error("Store not initialized. Run `keybridge init` first.")]
    NotInitialized,

    #[error("Wrong keybridge password, or store is corrupted.")]
    DecryptionFailed,

    #[error("Store is corrupted: {0}")]
    CorruptStore(String),

    #[error("Store used before `configure` was called.")]
    NotConfigured,

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True for the "resource not created yet" condition, which is never surfaced.
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, StoreError::Uninitialized(_))
    }
}

/// Lifecycle failures of the executor and the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge is shut down and no longer accepts commands.")]
    Closed,

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
