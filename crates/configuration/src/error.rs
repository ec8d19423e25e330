//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use query_engine_metadata::metadata::PathError;

use crate::environment;

/// The errors that can be thrown when parsing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {}:{line}:{column}: {message}", .file_path.display())]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] MetadataError),

    // Stringified because io::Error is not Clone
    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum WriteParsedConfigurationError {
    #[error("{file} is not inside {dir}", file = .file.display(), dir = .dir.display())]
    WritingOutsideDestinationDir { dir: PathBuf, file: PathBuf },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when turning a parsed configuration into a runtime one.
#[derive(Debug, thiserror::Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("could not resolve the connection uri: {0}")]
    MissingEnvironmentVariable(#[from] environment::Error),
    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] MetadataError),
}

/// Metadata entries that do not fit together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("filter set '{filter_set}': {source}")]
    FilterPath {
        filter_set: String,
        source: PathError,
    },
    #[error("filter set '{filter_set}' allows ordering by '{path}': {source}")]
    OrderByPath {
        filter_set: String,
        path: String,
        source: PathError,
    },
    #[error("template '{template}' refers to unknown filter set '{filter_set}'")]
    UnknownFilterSet {
        template: String,
        filter_set: String,
    },
    #[error("template '{template}': {message}")]
    UnresolvedTemplate { template: String, message: String },
}
