//! Error type for the secret bootstrap pipeline.

use std::path::PathBuf;
use thiserror::Error;

use super::types::SecretSource;

/// Errors raised while fetching, caching or applying secrets.
///
/// Transport failures and remote rejections are absorbed by the loader and
/// only surface from the client itself. Everything else is fatal for the
/// load that produced it.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Transport error talking to the secrets API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid secrets API URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fallback cache failed integrity check: {reason}")]
    Integrity { reason: String },

    #[error("Malformed secrets from {source_kind}: {error}")]
    Parse {
        source_kind: SecretSource,
        #[source]
        error: serde_json::Error,
    },

    #[error("Invalid entry '{key}' in secrets from {source_kind}: {reason}")]
    InvalidEntry {
        source_kind: SecretSource,
        key: String,
        reason: &'static str,
    },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("I/O error on fallback file '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl BootstrapError {
    pub(crate) fn integrity(reason: impl Into<String>) -> Self {
        BootstrapError::Integrity {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        BootstrapError::Io {
            path: path.into(),
            error,
        }
    }
}

/// Convenience alias used across the secrets module.
pub type BootstrapResult<T> = Result<T, BootstrapError>;
