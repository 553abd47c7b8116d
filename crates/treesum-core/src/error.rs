//! Error types for checksum computation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a [`ResourceProvider`](crate::ResourceProvider) or its sessions.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource does not exist in the provider.
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    /// A directory operation was requested on something else.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// The provider cannot perform this operation.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the git backend.
    #[cfg(feature = "git")]
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ProviderError {
    /// Create a free-form provider error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Broad category of a [`ChecksumError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Invalid input detected before any work started.
    Configuration,
    /// Failure while listing the resource hierarchy.
    Discovery,
    /// Failure while reading or digesting file content.
    Hash,
    /// The global wait ceiling was exceeded.
    Timeout,
    /// The report could not be written.
    Output,
}

/// Errors that can occur while computing or reporting checksums.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Algorithm name not recognized.
    #[error("Unknown checksum algorithm: {name}")]
    UnknownAlgorithm { name: String },

    /// Glob pattern could not be compiled.
    #[error("Invalid ignore pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The worker pool could not be created.
    #[error("Unable to start worker pool: {message}")]
    ThreadPool { message: String },

    /// A directory could not be listed.
    #[error("Unable to list directory \"{path}\": {source}")]
    Listing {
        path: String,
        #[source]
        source: ProviderError,
    },

    /// An external reference could not be resolved.
    #[error("Unable to process external \"{path}\": {source}")]
    External {
        path: String,
        #[source]
        source: ProviderError,
    },

    /// File content could not be read.
    #[error("Unable to get file content for \"{path}\": {source}")]
    Content {
        path: String,
        #[source]
        source: ProviderError,
    },

    /// The wait ceiling was exceeded.
    #[error("Checksum computation did not end within {limit:?}")]
    TimedOut { limit: Duration },

    /// The report could not be written.
    #[error("Unable to write report to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChecksumError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotADirectory { .. }
            | Self::UnknownAlgorithm { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidConfig { .. }
            | Self::ThreadPool { .. } => ErrorCategory::Configuration,
            Self::Listing { .. } | Self::External { .. } => ErrorCategory::Discovery,
            Self::Content { .. } => ErrorCategory::Hash,
            Self::TimedOut { .. } => ErrorCategory::Timeout,
            Self::Output { .. } => ErrorCategory::Output,
        }
    }

    /// Create an output error with path context.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    /// Check whether this error is fatal before any work starts.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}
