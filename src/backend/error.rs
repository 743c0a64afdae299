//! Backend update error types

use thiserror::Error;

use crate::extension::ExtensionError;

/// Errors raised by the backend update flows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Inference engine extension '{0}' not found")]
    EngineNotFound(String),

    #[error("Extension '{extension}' does not support {capability}")]
    Unsupported {
        extension: String,
        capability: String,
    },

    #[error("Current backend version not found")]
    CurrentBackendNotFound,

    #[error("Invalid backend version '{0}', expected <release>/<type>")]
    InvalidVersion(String),

    #[error("Backend update failed: {0}")]
    UpdateFailed(String),

    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

impl BackendError {
    pub fn unsupported<E: Into<String>, C: Into<String>>(extension: E, capability: C) -> Self {
        Self::Unsupported {
            extension: extension.into(),
            capability: capability.into(),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
