use crate::options::StoreOptions;
use crate::store::{Result, SecureStore};

/// Optional single destructive retry around a store operation.
///
/// With `reset_on_error`, a failed operation wipes the namespace and runs
/// once more; the second result is final. The benign `Uninitialized`
/// condition is never treated as a failure worth wiping for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub reset_on_error: bool,
}

impl RetryPolicy {
    pub fn from_options(options: &StoreOptions) -> Self {
        Self {
            reset_on_error: options.reset_on_error,
        }
    }

    pub fn run<T, F>(&self, store: &mut dyn SecureStore, mut op: F) -> Result<T>
    where
        F: FnMut(&mut dyn SecureStore) -> Result<T>,
    {
        match op(store) {
            Err(err) if self.reset_on_error && !err.is_uninitialized() => {
                tracing::warn!(error = %err, "store operation failed, wiping namespace and retrying");
                if let Err(wipe_err) = store.delete_all() {
                    tracing::warn!(error = %wipe_err, "wipe before retry failed");
                }
                op(store)
            }
            result => result,
        }
    }
}
