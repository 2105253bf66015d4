use std::collections::BTreeMap;

use thiserror::Error;

pub const NAMESPACE: &str = "namespace";
pub const KEY_PREFIX: &str = "keyPrefix";
pub const RESET_ON_ERROR: &str = "resetOnError";

pub const DEFAULT_NAMESPACE: &str = "keybridge";
pub const DEFAULT_KEY_PREFIX: &str = "a2V5YnJpZGdlLXByZWZpeA";

/// Raw per-call options as they arrive with a command.
pub type Options = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid option '{key}': {reason}")]
pub struct OptionError {
    pub key: String,
    pub reason: String,
}

/// Backend configuration for exactly one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub namespace: String,
    pub key_prefix: String,
    pub reset_on_error: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            reset_on_error: false,
        }
    }
}

impl StoreOptions {
    /// Parse a raw option map. Missing keys fall back to defaults; unknown keys are ignored.
    pub fn parse(raw: &Options) -> Result<Self, OptionError> {
        let mut options = Self::default();

        for (key, value) in raw {
            match key.as_str() {
                NAMESPACE => options.namespace = non_empty(key, value)?,
                KEY_PREFIX => options.key_prefix = non_empty(key, value)?,
                RESET_ON_ERROR => options.reset_on_error = parse_bool(key, value)?,
                _ => tracing::debug!(option = %key, "ignoring unknown option"),
            }
        }

        if options.namespace.contains(['/', '\\']) || options.namespace.starts_with('.') {
            return Err(OptionError {
                key: NAMESPACE.into(),
                reason: "must be a plain name without path separators".into(),
            });
        }

        Ok(options)
    }

    /// The storage key for a logical key in this prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}_{}", self.key_prefix, key)
    }

    /// Inverse of [`prefixed_key`](Self::prefixed_key); `None` for keys outside the prefix.
    pub fn strip_prefix<'a>(&self, stored: &'a str) -> Option<&'a str> {
        stored
            .strip_prefix(self.key_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, OptionError> {
    if value.is_empty() {
        return Err(OptionError {
            key: key.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(value.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, OptionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(OptionError {
            key: key.into(),
            reason: format!("expected \"true\" or \"false\", got \"{other}\""),
        }),
    }
}
