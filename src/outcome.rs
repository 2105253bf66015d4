use std::collections::BTreeMap;
use std::fmt;

use crate::error::StoreError;

/// Machine-readable error codes returned to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    NullValue,
    MissingArgument,
    InvalidArgument,
    InvalidOption,
    /// Generic failure marker for backend faults and caught panics.
    Backend,
    Closed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NullValue => "null_value",
            ErrorCode::MissingArgument => "missing_argument",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::InvalidOption => "invalid_option",
            ErrorCode::Backend => "exception",
            ErrorCode::Closed => "closed",
        }
    }

    /// Validation failures never touch the store.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            ErrorCode::NullValue
                | ErrorCode::MissingArgument
                | ErrorCode::InvalidArgument
                | ErrorCode::InvalidOption
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeError {
    pub code: ErrorCode,
    pub message: Option<String>,
    pub details: Option<String>,
}

impl OutcomeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            details: None,
        }
    }

    /// A backend fault for `method`, with the full error chain as details.
    pub fn backend(method: &str, err: &StoreError) -> Self {
        Self {
            code: ErrorCode::Backend,
            message: Some(method.to_string()),
            details: Some(error_chain(err)),
        }
    }

    /// A caught panic on the worker.
    pub fn panicked(label: &str, details: String) -> Self {
        Self {
            code: ErrorCode::Backend,
            message: Some(label.to_string()),
            details: Some(details),
        }
    }

    pub fn closed() -> Self {
        Self::new(ErrorCode::Closed, "bridge shut down before the command ran")
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for OutcomeError {}

/// Success payloads. `Debug` redacts stored values.
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    Value(String),
    Entries(BTreeMap<String, String>),
    Bool(bool),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => f.write_str("None"),
            Payload::Value(_) => f.write_str("Value([REDACTED])"),
            Payload::Entries(entries) => f
                .debug_tuple("Entries")
                .field(&entries.keys().collect::<Vec<_>>())
                .finish(),
            Payload::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
        }
    }
}

/// The resolution of exactly one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(Payload),
    Failure(OutcomeError),
    /// The method is not supported. Distinct from a failure.
    NotImplemented,
}

impl Outcome {
    pub fn empty() -> Self {
        Outcome::Success(Payload::None)
    }

    pub fn failure(error: OutcomeError) -> Self {
        Outcome::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn error(&self) -> Option<&OutcomeError> {
        match self {
            Outcome::Failure(err) => Some(err),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Success(payload) => Some(payload),
            _ => None,
        }
    }
}

impl From<Option<String>> for Payload {
    fn from(value: Option<String>) -> Self {
        value.map_or(Payload::None, Payload::Value)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_carries_method_and_details() {
        let err = OutcomeError::backend("read", &StoreError::DecryptionFailed);
        assert_eq!(err.code.as_str(), "exception");
        assert_eq!(err.message.as_deref(), Some("read"));
        assert!(err.details.unwrap().contains("Wrong keybridge password"));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = OutcomeError::backend("write", &StoreError::Io(io));
        assert!(err.details.unwrap().contains("disk gone"));
    }

    #[test]
    fn test_payload_debug_redacts_values() {
        let payload = Payload::Value("hunter2".into());
        assert!(!format!("{payload:?}").contains("hunter2"));

        let entries = Payload::Entries(BTreeMap::from([("k".to_string(), "hunter2".to_string())]));
        let debug = format!("{entries:?}");
        assert!(debug.contains('k'));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_validation_codes() {
        assert!(ErrorCode::NullValue.is_validation());
        assert!(ErrorCode::MissingArgument.is_validation());
        assert!(!ErrorCode::Backend.is_validation());
        assert!(!ErrorCode::Closed.is_validation());
    }
}
