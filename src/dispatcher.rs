use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};

use crate::command::{Command, Method};
use crate::error::StoreError;
use crate::options::StoreOptions;
use crate::outcome::{ErrorCode, Outcome, OutcomeError, Payload};
use crate::retry::RetryPolicy;
use crate::store::{SecureStore, StoreState};

/// A validated command with its key already prefixed.
enum Operation<'a> {
    Write { key: String, value: &'a SecretString },
    Read { key: String },
    ReadAll,
    ContainsKey { key: String },
    Delete { key: String },
    DeleteAll,
}

impl Operation<'_> {
    /// Result reported when the namespace does not exist yet.
    fn empty_payload(&self) -> Payload {
        match self {
            Operation::ReadAll => Payload::Entries(BTreeMap::new()),
            Operation::ContainsKey { .. } => Payload::Bool(false),
            _ => Payload::None,
        }
    }

    fn creates_namespace(&self) -> bool {
        matches!(self, Operation::Write { .. })
    }
}

/// Maps commands onto the store. Lives on the worker thread.
pub struct Dispatcher {
    store: Box<dyn SecureStore>,
}

impl Dispatcher {
    pub fn new(store: Box<dyn SecureStore>) -> Self {
        Self { store }
    }

    pub fn handle(&mut self, command: &Command) -> Outcome {
        let method = &command.method;
        tracing::debug!(%method, "dispatching command");

        if let Method::Unknown(name) = method {
            tracing::debug!(method = %name, "method not implemented");
            return Outcome::NotImplemented;
        }

        let options = match StoreOptions::parse(&command.options) {
            Ok(options) => options,
            Err(e) => {
                return Outcome::failure(OutcomeError::new(ErrorCode::InvalidOption, e.to_string()))
            }
        };

        let operation = match plan(command, &options) {
            Ok(operation) => operation,
            Err(err) => return Outcome::failure(err),
        };

        let state = match self.store.configure(&options) {
            Ok(state) => state,
            Err(e) => return self.failed(method, &e),
        };

        if state == StoreState::Uninitialized && !operation.creates_namespace() {
            tracing::info!(namespace = %options.namespace, %method, "namespace not created yet, treating as empty");
            return Outcome::Success(operation.empty_payload());
        }

        let policy = RetryPolicy::from_options(&options);
        match self.execute(&operation, &options, policy) {
            Ok(payload) => Outcome::Success(payload),
            Err(e) if e.is_uninitialized() => {
                tracing::info!(namespace = %options.namespace, %method, "namespace disappeared, treating as empty");
                Outcome::Success(operation.empty_payload())
            }
            Err(e) => self.failed(method, &e),
        }
    }

    fn execute(
        &mut self,
        operation: &Operation<'_>,
        options: &StoreOptions,
        policy: RetryPolicy,
    ) -> Result<Payload, StoreError> {
        let store = &mut *self.store;
        match operation {
            Operation::Write { key, value } => {
                policy.run(store, |s| s.write(key, value.expose_secret()))?;
                Ok(Payload::None)
            }
            Operation::Read { key } => {
                if policy.run(store, |s| s.contains_key(key))? {
                    Ok(policy.run(store, |s| s.read(key))?.into())
                } else {
                    Ok(Payload::None)
                }
            }
            Operation::ReadAll => {
                let entries = policy.run(store, |s| s.read_all())?;
                Ok(Payload::Entries(
                    entries
                        .into_iter()
                        .filter_map(|(key, value)| {
                            options
                                .strip_prefix(&key)
                                .map(|logical| (logical.to_string(), value))
                        })
                        .collect(),
                ))
            }
            Operation::ContainsKey { key } => {
                Ok(Payload::Bool(policy.run(store, |s| s.contains_key(key))?))
            }
            Operation::Delete { key } => {
                policy.run(store, |s| s.delete(key))?;
                Ok(Payload::None)
            }
            Operation::DeleteAll => {
                policy.run(store, |s| s.delete_all())?;
                Ok(Payload::None)
            }
        }
    }

    fn failed(&self, method: &Method, err: &StoreError) -> Outcome {
        tracing::warn!(%method, error = %err, "store operation failed");
        Outcome::failure(OutcomeError::backend(method.name(), err))
    }
}

/// Validate arguments and resolve the effective key. Never touches the store.
fn plan<'a>(command: &'a Command, options: &StoreOptions) -> Result<Operation<'a>, OutcomeError> {
    let method = &command.method;
    let key = if method.needs_key() {
        match &command.key {
            Some(key) => options.prefixed_key(key),
            None => {
                return Err(OutcomeError::new(
                    ErrorCode::MissingArgument,
                    format!("`key` is required for {method}"),
                ))
            }
        }
    } else {
        String::new()
    };

    Ok(match method {
        Method::Write => match &command.value {
            Some(value) => Operation::Write { key, value },
            None => {
                return Err(OutcomeError::new(
                    ErrorCode::NullValue,
                    "`value` must not be null for write",
                ))
            }
        },
        Method::Read => Operation::Read { key },
        Method::ReadAll => Operation::ReadAll,
        Method::ContainsKey => Operation::ContainsKey { key },
        Method::Delete => Operation::Delete { key },
        Method::DeleteAll => Operation::DeleteAll,
        Method::Unknown(name) => {
            return Err(OutcomeError::new(
                ErrorCode::InvalidArgument,
                format!("unsupported method {name}"),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::options::Options;
    use crate::store::MemoryStore;

    /// What the fault-injecting store observed.
    #[derive(Default)]
    struct Probe {
        calls: usize,
        wipes: usize,
        /// Entry count seen at the start of each write/read/read_all call.
        sizes_seen: Vec<usize>,
    }

    /// Memory store that fails its first `failures` data operations.
    struct FaultyStore {
        inner: MemoryStore,
        failures: usize,
        probe: Arc<Mutex<Probe>>,
    }

    impl FaultyStore {
        fn new(failures: usize) -> (Self, Arc<Mutex<Probe>>) {
            let probe = Arc::new(Mutex::new(Probe::default()));
            let store = Self {
                inner: MemoryStore::new(),
                failures,
                probe: Arc::clone(&probe),
            };
            (store, probe)
        }

        fn enter(&mut self) -> crate::store::Result<()> {
            let size = match self.inner.read_all() {
                Ok(entries) => entries.len(),
                Err(_) => 0,
            };
            let mut probe = self.probe.lock().unwrap();
            probe.calls += 1;
            probe.sizes_seen.push(size);
            if self.failures > 0 {
                self.failures -= 1;
                return Err(StoreError::DecryptionFailed);
            }
            Ok(())
        }
    }

    impl SecureStore for FaultyStore {
        fn configure(&mut self, options: &StoreOptions) -> crate::store::Result<StoreState> {
            self.inner.configure(options)
        }
        fn read(&mut self, key: &str) -> crate::store::Result<Option<String>> {
            self.enter()?;
            self.inner.read(key)
        }
        fn write(&mut self, key: &str, value: &str) -> crate::store::Result<()> {
            self.enter()?;
            self.inner.write(key, value)
        }
        fn delete(&mut self, key: &str) -> crate::store::Result<()> {
            self.inner.delete(key)
        }
        fn delete_all(&mut self) -> crate::store::Result<()> {
            self.probe.lock().unwrap().wipes += 1;
            self.inner.delete_all()
        }
        fn contains_key(&mut self, key: &str) -> crate::store::Result<bool> {
            self.inner.contains_key(key)
        }
        fn read_all(&mut self) -> crate::store::Result<BTreeMap<String, String>> {
            self.enter()?;
            self.inner.read_all()
        }
    }

    fn memory() -> Dispatcher {
        Dispatcher::new(Box::new(MemoryStore::new()))
    }

    fn secret(value: &str) -> Option<SecretString> {
        Some(SecretString::new(value.to_string()))
    }

    fn opts(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn value(outcome: Outcome) -> Option<String> {
        match outcome {
            Outcome::Success(Payload::Value(v)) => Some(v),
            Outcome::Success(Payload::None) => None,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_read_unwritten_key_is_absent() {
        let mut d = memory();
        assert_eq!(d.handle(&Command::read("nope", Options::new())), Outcome::empty());
    }

    #[test]
    fn test_write_then_read() {
        let mut d = memory();
        let written = d.handle(&Command::write("token", secret("abc"), Options::new()));
        assert_eq!(written, Outcome::empty());
        assert_eq!(
            value(d.handle(&Command::read("token", Options::new()))).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_delete_then_read_is_absent() {
        let mut d = memory();
        d.handle(&Command::write("k", secret("v"), Options::new()));
        assert_eq!(d.handle(&Command::delete("k", Options::new())), Outcome::empty());
        assert_eq!(d.handle(&Command::read("k", Options::new())), Outcome::empty());
        // Deleting a key that never existed still succeeds.
        assert_eq!(d.handle(&Command::delete("ghost", Options::new())), Outcome::empty());
    }

    #[test]
    fn test_delete_all_then_read_all_is_empty() {
        let mut d = memory();
        d.handle(&Command::write("a", secret("1"), Options::new()));
        d.handle(&Command::write("b", secret("2"), Options::new()));
        assert_eq!(d.handle(&Command::delete_all(Options::new())), Outcome::empty());
        assert_eq!(
            d.handle(&Command::read_all(Options::new())),
            Outcome::Success(Payload::Entries(BTreeMap::new()))
        );
    }

    #[test]
    fn test_read_all_strips_prefix_and_filters_foreign_keys() {
        let mut d = memory();
        let app = opts(&[("keyPrefix", "app")]);
        let other = opts(&[("keyPrefix", "other")]);
        d.handle(&Command::write("a", secret("1"), app.clone()));
        d.handle(&Command::write("b", secret("2"), app.clone()));
        d.handle(&Command::write("c", secret("3"), other));

        let expected = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(
            d.handle(&Command::read_all(app)),
            Outcome::Success(Payload::Entries(expected))
        );
    }

    #[test]
    fn test_contains_key() {
        let mut d = memory();
        d.handle(&Command::write("k", secret("v"), Options::new()));
        assert_eq!(
            d.handle(&Command::contains_key("k", Options::new())),
            Outcome::Success(Payload::Bool(true))
        );
        assert_eq!(
            d.handle(&Command::contains_key("other", Options::new())),
            Outcome::Success(Payload::Bool(false))
        );
    }

    #[test]
    fn test_uninitialized_namespace_reads_as_empty() {
        let mut d = memory();
        let fresh = opts(&[("namespace", "fresh")]);
        assert_eq!(
            d.handle(&Command::read_all(fresh.clone())),
            Outcome::Success(Payload::Entries(BTreeMap::new()))
        );
        assert_eq!(
            d.handle(&Command::contains_key("k", fresh.clone())),
            Outcome::Success(Payload::Bool(false))
        );
        assert_eq!(d.handle(&Command::delete_all(fresh)), Outcome::empty());
    }

    #[test]
    fn test_null_value_rejected_and_prior_value_kept() {
        let mut d = memory();
        d.handle(&Command::write("k", secret("original"), Options::new()));

        let outcome = d.handle(&Command::write("k", None, Options::new()));
        assert_eq!(outcome.error().unwrap().code, ErrorCode::NullValue);
        assert_eq!(
            value(d.handle(&Command::read("k", Options::new()))).as_deref(),
            Some("original")
        );
    }

    #[test]
    fn test_null_value_never_reaches_store() {
        let (store, probe) = FaultyStore::new(0);
        let mut d = Dispatcher::new(Box::new(store));
        d.handle(&Command::write("k", None, opts(&[("resetOnError", "true")])));
        let probe = probe.lock().unwrap();
        assert_eq!(probe.calls, 0);
        assert_eq!(probe.wipes, 0);
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut d = memory();
        let outcome = d.handle(&Command::new(Method::Read, Options::new()));
        assert_eq!(outcome.error().unwrap().code, ErrorCode::MissingArgument);
    }

    #[test]
    fn test_invalid_option_rejected() {
        let mut d = memory();
        let outcome = d.handle(&Command::read("k", opts(&[("resetOnError", "maybe")])));
        assert_eq!(outcome.error().unwrap().code, ErrorCode::InvalidOption);
    }

    #[test]
    fn test_unknown_method_not_implemented() {
        let mut d = memory();
        let command = Command::new(Method::parse("migrate"), Options::new());
        assert_eq!(d.handle(&command), Outcome::NotImplemented);
    }

    #[test]
    fn test_reset_on_error_wipes_before_successful_retry() {
        let (mut store, probe) = FaultyStore::new(1);
        store.inner.configure(&StoreOptions::default()).unwrap();
        store.inner.write("x_a", "1").unwrap();
        store.inner.write("x_b", "2").unwrap();
        let mut d = Dispatcher::new(Box::new(store));

        let outcome = d.handle(&Command::write(
            "c",
            secret("3"),
            opts(&[("resetOnError", "true")]),
        ));
        assert_eq!(outcome, Outcome::empty());

        let probe = probe.lock().unwrap();
        assert_eq!(probe.wipes, 1);
        // First attempt saw the two old entries; the retry saw an empty store.
        assert_eq!(probe.sizes_seen, vec![2, 0]);
    }

    #[test]
    fn test_no_reset_surfaces_failure_without_wipe() {
        let (mut store, probe) = FaultyStore::new(1);
        store.inner.configure(&StoreOptions::default()).unwrap();
        store.inner.write("x", "1").unwrap();
        let mut d = Dispatcher::new(Box::new(store));

        let outcome = d.handle(&Command::write("k", secret("v"), Options::new()));
        let err = outcome.error().expect("failure expected");
        assert_eq!(err.code, ErrorCode::Backend);
        assert_eq!(err.message.as_deref(), Some("write"));
        assert!(err.details.is_some());

        assert_eq!(probe.lock().unwrap().wipes, 0);
        assert_eq!(
            d.handle(&Command::contains_key("k", Options::new())),
            Outcome::Success(Payload::Bool(false))
        );
    }

    #[test]
    fn test_reset_on_error_read_of_corrupt_namespace_reads_empty() {
        let (mut store, probe) = FaultyStore::new(1);
        store.inner.configure(&StoreOptions::default()).unwrap();
        store.inner.write("x", "1").unwrap();
        let mut d = Dispatcher::new(Box::new(store));

        let outcome = d.handle(&Command::read_all(opts(&[("resetOnError", "true")])));
        assert_eq!(outcome, Outcome::Success(Payload::Entries(BTreeMap::new())));
        assert_eq!(probe.lock().unwrap().wipes, 1);
    }

    #[test]
    fn test_options_not_carried_across_commands() {
        let mut d = memory();
        d.handle(&Command::write("k", secret("v"), opts(&[("namespace", "one")])));
        // Default namespace on the next call, not the previous one.
        assert_eq!(d.handle(&Command::read("k", Options::new())), Outcome::empty());
        assert_eq!(
            value(d.handle(&Command::read("k", opts(&[("namespace", "one")])))).as_deref(),
            Some("v")
        );
    }
}
