//! Backend version strings of the form `<release>/<type>`, e.g. `b3224/cuda12`.

use std::fmt;
use std::str::FromStr;

use crate::backend::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendVersion {
    release: String,
    backend_type: String,
}

impl BackendVersion {
    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    /// Same backend type, new release.
    pub fn with_release(&self, release: &str) -> Self {
        Self {
            release: release.to_string(),
            backend_type: self.backend_type.clone(),
        }
    }
}

impl FromStr for BackendVersion {
    type Err = BackendError;

    // The type may itself contain '/', only the first separator splits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((release, backend_type)) if !release.is_empty() && !backend_type.is_empty() => {
                Ok(Self {
                    release: release.to_string(),
                    backend_type: backend_type.to_string(),
                })
            }
            _ => Err(BackendError::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.release, self.backend_type)
    }
}
