//! Errors for translation.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{AttributeType, FilterOperation, PathError};
use thiserror::Error;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("{operation} is not supported on '{key}' of type {attribute_type}")]
    UnsupportedOperation {
        key: String,
        operation: FilterOperation,
        attribute_type: AttributeType,
    },
    #[error("value '{value}' of '{key}' cannot be used as {attribute_type}")]
    ValueCoercion {
        key: String,
        value: String,
        attribute_type: AttributeType,
    },
    #[error("{operation} on '{key}' expects {expected}")]
    ValueShape {
        key: String,
        operation: FilterOperation,
        expected: &'static str,
    },
    #[error("'{0}' is not a valid column reference")]
    InvalidIdentifier(String),
}

/// Problems with request parameters, keyed by parameter name.
/// Every offending parameter is reported, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("Validation failed: {}", describe(.errors))]
pub struct ValidationError {
    pub errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn single(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = ValidationError::default();
        error.insert(key, message);
        error
    }

    /// Record a problem. The first message for a key is kept.
    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(key.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` if nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn describe(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(key, message)| format!("{key}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}
