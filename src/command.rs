use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Deserialize;
use strum::EnumString;

use crate::options::Options;

/// Operations the bridge understands, keyed by their wire names.
#[derive(Clone, Debug, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    Write,
    Read,
    ReadAll,
    ContainsKey,
    Delete,
    DeleteAll,
    #[strum(default)]
    Unknown(String),
}

impl Method {
    /// Parse a wire name. Unrecognized names become [`Method::Unknown`].
    pub fn parse(name: &str) -> Self {
        Method::from_str(name).unwrap_or_else(|_| Method::Unknown(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            Method::Write => "write",
            Method::Read => "read",
            Method::ReadAll => "readAll",
            Method::ContainsKey => "containsKey",
            Method::Delete => "delete",
            Method::DeleteAll => "deleteAll",
            Method::Unknown(name) => name,
        }
    }

    /// Whether the method addresses a single key.
    pub fn needs_key(&self) -> bool {
        matches!(
            self,
            Method::Write | Method::Read | Method::ContainsKey | Method::Delete
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single request to the store, immutable once submitted.
#[derive(Debug)]
pub struct Command {
    pub method: Method,
    pub key: Option<String>,
    pub value: Option<SecretString>,
    pub options: Options,
}

/// Generic argument map accompanying a method call.
#[derive(Debug, Default, Deserialize)]
pub struct CallArguments {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<SecretString>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Command {
    pub fn new(method: Method, options: Options) -> Self {
        Self {
            method,
            key: None,
            value: None,
            options,
        }
    }

    pub fn write(key: impl Into<String>, value: Option<SecretString>, options: Options) -> Self {
        Self {
            key: Some(key.into()),
            value,
            ..Self::new(Method::Write, options)
        }
    }

    pub fn read(key: impl Into<String>, options: Options) -> Self {
        Self::with_key(Method::Read, key, options)
    }

    pub fn read_all(options: Options) -> Self {
        Self::new(Method::ReadAll, options)
    }

    pub fn contains_key(key: impl Into<String>, options: Options) -> Self {
        Self::with_key(Method::ContainsKey, key, options)
    }

    pub fn delete(key: impl Into<String>, options: Options) -> Self {
        Self::with_key(Method::Delete, key, options)
    }

    pub fn delete_all(options: Options) -> Self {
        Self::new(Method::DeleteAll, options)
    }

    /// Build a command from a method name and its decoded arguments.
    pub fn from_arguments(method: &str, arguments: CallArguments) -> Self {
        Self {
            method: Method::parse(method),
            key: arguments.key,
            value: arguments.value,
            options: arguments.options,
        }
    }

    /// Build a command from a method name and a JSON argument object.
    pub fn from_json(method: &str, arguments: serde_json::Value) -> serde_json::Result<Self> {
        let arguments = if arguments.is_null() {
            CallArguments::default()
        } else {
            serde_json::from_value(arguments)?
        };
        Ok(Self::from_arguments(method, arguments))
    }

    fn with_key(method: Method, key: impl Into<String>, options: Options) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(method, options)
        }
    }
}
