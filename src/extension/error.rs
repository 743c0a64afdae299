//! Extension Error Types
//! 
//! Error handling for extension activation, lookup and capability calls.

use thiserror::Error;

/// Result type for extension operations
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Error types for extension operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtensionError {
    /// Host environment is not available (running outside the native shell)
    #[error("Host environment unavailable: {message}")]
    HostUnavailable { message: String },
    
    /// Host call rejected or failed
    #[error("Host call failed: {message}")]
    HostCallFailed { message: String },
    
    /// No module is available at the resolved location
    #[error("Module not found: {location}")]
    ModuleNotFound { location: String },
    
    /// Module could not be loaded or constructed
    #[error("Extension loading error: {message}")]
    LoadingFailed { message: String },
    
    /// Host record could not be turned into a descriptor
    #[error("Malformed extension descriptor: {message}")]
    MalformedDescriptor { message: String },
    
    /// Extension lifecycle hook failed
    #[error("Extension lifecycle error in '{extension}': {message}")]
    LifecycleFailed { extension: String, message: String },
    
    /// Extension not found in the registry
    #[error("Extension not found: {name}")]
    ExtensionNotFound { name: String },
    
    /// Extension does not provide the requested capability
    #[error("Extension '{extension}' does not support {capability}")]
    Unsupported { extension: String, capability: String },
    
    /// Capability call into an extension failed
    #[error("Extension call failed: {message}")]
    CallFailed { message: String },
    
    /// Filesystem error surfaced by a host implementation
    #[error("IO error: {message}")]
    Io { message: String },
}

impl ExtensionError {
    /// Create a host unavailable error
    pub fn host_unavailable<S: Into<String>>(message: S) -> Self {
        Self::HostUnavailable { message: message.into() }
    }
    
    /// Create a host call failed error
    pub fn host_call_failed<S: Into<String>>(message: S) -> Self {
        Self::HostCallFailed { message: message.into() }
    }
    
    /// Create a module not found error
    pub fn module_not_found<S: Into<String>>(location: S) -> Self {
        Self::ModuleNotFound { location: location.into() }
    }
    
    /// Create a loading failed error
    pub fn loading_failed<S: Into<String>>(message: S) -> Self {
        Self::LoadingFailed { message: message.into() }
    }
    
    /// Create a malformed descriptor error
    pub fn malformed_descriptor<S: Into<String>>(message: S) -> Self {
        Self::MalformedDescriptor { message: message.into() }
    }
    
    /// Create a lifecycle error
    pub fn lifecycle_failed<S: Into<String>, M: Into<String>>(extension: S, message: M) -> Self {
        Self::LifecycleFailed { extension: extension.into(), message: message.into() }
    }
    
    /// Create an extension not found error
    pub fn extension_not_found<S: Into<String>>(name: S) -> Self {
        Self::ExtensionNotFound { name: name.into() }
    }
    
    /// Create an unsupported capability error
    pub fn unsupported<S: Into<String>, C: Into<String>>(extension: S, capability: C) -> Self {
        Self::Unsupported { extension: extension.into(), capability: capability.into() }
    }
    
    /// Create a call failed error
    pub fn call_failed<S: Into<String>>(message: S) -> Self {
        Self::CallFailed { message: message.into() }
    }
    
    /// Check if error originates at the host boundary
    pub fn is_host_error(&self) -> bool {
        matches!(self,
            ExtensionError::HostUnavailable { .. } |
            ExtensionError::HostCallFailed { .. }
        )
    }
    
    /// Check if error concerns a single activation and should not abort the batch
    pub fn is_activation_error(&self) -> bool {
        matches!(self,
            ExtensionError::ModuleNotFound { .. } |
            ExtensionError::LoadingFailed { .. } |
            ExtensionError::MalformedDescriptor { .. }
        )
    }
}

impl From<std::io::Error> for ExtensionError {
    fn from(err: std::io::Error) -> Self {
        ExtensionError::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for ExtensionError {
    fn from(err: serde_json::Error) -> Self {
        ExtensionError::malformed_descriptor(format!("JSON error: {}", err))
    }
}
