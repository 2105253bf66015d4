pub mod encrypted;
pub mod memory;

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::options::StoreOptions;

pub use encrypted::{EncryptedFileStore, KdfParams, MasterKey};
pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Whether the configured namespace exists yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    Ready,
    /// Nothing has ever been written to this namespace.
    Uninitialized,
}

/// Durable key-value storage behind the bridge.
///
/// Keys arrive already prefixed. Implementations are owned by a single worker
/// thread, so every method takes `&mut self` and no internal locking is needed.
pub trait SecureStore: Send {
    /// Apply the options of the command about to run. Called before every command.
    fn configure(&mut self, options: &StoreOptions) -> Result<StoreState>;
    fn read(&mut self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
    fn delete_all(&mut self) -> Result<()>;
    fn contains_key(&mut self, key: &str) -> Result<bool>;
    /// Every entry in the configured namespace, keys still prefixed.
    fn read_all(&mut self) -> Result<BTreeMap<String, String>>;
}
