//! Errors for query execution.

use std::collections::BTreeMap;

use query_engine_translation::translation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Query planning and execution errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Translation(#[from] translation::error::Error),
    #[error(transparent)]
    Validation(#[from] translation::error::ValidationError),
    #[error("{0}")]
    StateInvariant(String),
    #[error("unknown template '{0}'")]
    TemplateNotFound(String),
    #[error("unknown filter set '{0}'")]
    FilterSetNotFound(String),
    #[error("filter set '{0}' does not target an entity")]
    FilterSetWithoutEntity(String),
    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error";

/// What a caller may be told about an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl Error {
    /// Is the request at fault, rather than the configuration or the database?
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Validation(_)
            | Error::TemplateNotFound(_)
            | Error::FilterSetNotFound(_) => true,
            Error::Translation(error) => !matches!(
                error,
                translation::error::Error::Path(_)
                    | translation::error::Error::UnsupportedOperation { .. }
            ),
            Error::StateInvariant(_)
            | Error::FilterSetWithoutEntity(_)
            | Error::Decode { .. }
            | Error::Database(_) => false,
        }
    }

    /// Client errors are described; everything else is reported as an internal
    /// error without details such as SQL text.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Error::Validation(validation) => ErrorResponse {
                message: "Validation failed".to_string(),
                errors: validation.errors.clone(),
            },
            error if error.is_client_error() => ErrorResponse {
                message: error.to_string(),
                errors: BTreeMap::new(),
            },
            error => {
                tracing::error!(error = %error, "request failed");
                ErrorResponse {
                    message: INTERNAL_ERROR_MESSAGE.to_string(),
                    errors: BTreeMap::new(),
                }
            }
        }
    }
}
