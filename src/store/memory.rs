//! Process-local store. Nothing is encrypted or persisted; intended for tests
//! and for hosts that only need the bridge's ordering guarantees.

use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::options::StoreOptions;
use crate::store::{Result, SecureStore, StoreState};

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: HashMap<String, HashMap<String, String>>,
    current: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self) -> Result<&str> {
        self.current.as_deref().ok_or(StoreError::NotConfigured)
    }

    fn entries(&self) -> Result<&HashMap<String, String>> {
        let namespace = self.namespace()?;
        self.namespaces
            .get(namespace)
            .ok_or_else(|| StoreError::Uninitialized(namespace.to_string()))
    }
}

impl SecureStore for MemoryStore {
    fn configure(&mut self, options: &StoreOptions) -> Result<StoreState> {
        self.current = Some(options.namespace.clone());
        Ok(if self.namespaces.contains_key(&options.namespace) {
            StoreState::Ready
        } else {
            StoreState::Uninitialized
        })
    }

    fn read(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let namespace = self.namespace()?.to_string();
        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let namespace = self.namespace()?.to_string();
        match self.namespaces.get_mut(&namespace) {
            Some(entries) => {
                entries.remove(key);
                Ok(())
            }
            None => Err(StoreError::Uninitialized(namespace)),
        }
    }

    fn delete_all(&mut self) -> Result<()> {
        let namespace = self.namespace()?.to_string();
        self.namespaces.remove(&namespace);
        Ok(())
    }

    fn contains_key(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries()?.contains_key(key))
    }

    fn read_all(&mut self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .entries()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
