//! Core Extension Traits
//! 
//! Defines the capability hierarchy that loaded extensions implement. Capabilities
//! are resolved through explicit casts on the `Extension` trait rather than by
//! probing an instance for fields at runtime.

use std::fmt;
use std::str::FromStr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::backend::{BackendUpdateInfo, BackendUpdateResult};
use super::error::{ExtensionError, ExtensionResult};

/// Capability type an extension declares. The registry stores an instance
/// under its declared type when it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionType {
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "conversational")]
    Conversational,
    #[serde(rename = "inference")]
    Inference,
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "systemMonitoring")]
    SystemMonitoring,
    #[serde(rename = "huggingFace")]
    HuggingFace,
    #[serde(rename = "engine")]
    Engine,
    #[serde(rename = "hardware")]
    Hardware,
    #[serde(rename = "rag")]
    Rag,
    #[serde(rename = "vectorDB")]
    VectorDb,
    #[serde(rename = "mcp")]
    Mcp,
}

impl ExtensionType {
    /// All known capability types
    pub const ALL: [ExtensionType; 11] = [
        ExtensionType::Assistant,
        ExtensionType::Conversational,
        ExtensionType::Inference,
        ExtensionType::Model,
        ExtensionType::SystemMonitoring,
        ExtensionType::HuggingFace,
        ExtensionType::Engine,
        ExtensionType::Hardware,
        ExtensionType::Rag,
        ExtensionType::VectorDb,
        ExtensionType::Mcp,
    ];

    /// Wire representation, also used as the registry key
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionType::Assistant => "assistant",
            ExtensionType::Conversational => "conversational",
            ExtensionType::Inference => "inference",
            ExtensionType::Model => "model",
            ExtensionType::SystemMonitoring => "systemMonitoring",
            ExtensionType::HuggingFace => "huggingFace",
            ExtensionType::Engine => "engine",
            ExtensionType::Hardware => "hardware",
            ExtensionType::Rag => "rag",
            ExtensionType::VectorDb => "vectorDB",
            ExtensionType::Mcp => "mcp",
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtensionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtensionType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown extension type: {}", s))
    }
}

/// Core interface every loaded extension implements
#[async_trait]
pub trait Extension: Send + Sync {
    /// Implementation name, used for diagnostics and heuristic lookups
    fn name(&self) -> &str;
    
    /// Declared capability type, if any
    fn extension_type(&self) -> Option<ExtensionType> {
        None
    }
    
    /// Called once the extension has been registered and the host is ready
    async fn on_load(&self) -> ExtensionResult<()>;
    
    /// Called when the host shuts extensions down
    async fn on_unload(&self) -> ExtensionResult<()>;
    
    /// Cast to EngineExtension if this extension runs model inference
    fn as_engine(&self) -> Option<&dyn EngineExtension> {
        None
    }
    
    /// Cast to BackendManager if this extension manages native backend binaries
    fn as_backend_manager(&self) -> Option<&dyn BackendManager> {
        None
    }
}

/// Extension variant that runs model inference for a named provider
pub trait EngineExtension: Extension {
    /// Provider this engine serves (e.g. "llamacpp")
    fn provider(&self) -> &str;
}

/// Backend binary management offered by inference engines. Every method has a
/// default that reports the capability as unsupported.
#[async_trait]
pub trait BackendManager: Extension {
    /// Current extension settings
    async fn get_settings(&self) -> ExtensionResult<Vec<ExtensionSetting>> {
        Err(ExtensionError::unsupported(self.name(), "getSettings"))
    }
    
    /// Ask the engine whether a newer backend release exists
    async fn check_backend_for_updates(&self) -> ExtensionResult<BackendUpdateInfo> {
        Err(ExtensionError::unsupported(self.name(), "checkBackendForUpdates"))
    }
    
    /// Switch to the given `<release>/<type>` backend
    async fn update_backend(&self, target_backend: &str) -> ExtensionResult<BackendUpdateResult> {
        let _ = target_backend;
        Err(ExtensionError::unsupported(self.name(), "updateBackend"))
    }
    
    /// Install a backend archive from a local file
    async fn install_backend(&self, file_path: &str) -> ExtensionResult<()> {
        let _ = file_path;
        Err(ExtensionError::unsupported(self.name(), "installBackend"))
    }
    
    /// Rescan the set of installed backends
    async fn configure_backends(&self) -> ExtensionResult<()> {
        Err(ExtensionError::unsupported(self.name(), "configureBackends"))
    }
}

/// Controller properties of a setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerProps {
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A single extension setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSetting {
    pub key: String,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_props: Option<ControllerProps>,
}

impl ExtensionSetting {
    /// Create a setting with a value
    pub fn new<S: Into<String>>(key: S, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            title: None,
            description: None,
            controller_props: Some(ControllerProps { value }),
        }
    }
    
    /// Current value, if the setting carries one
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.controller_props.as_ref().map(|props| &props.value)
    }
}

/// Find a setting by key
pub fn find_setting<'a>(settings: &'a [ExtensionSetting], key: &str) -> Option<&'a ExtensionSetting> {
    settings.iter().find(|setting| setting.key == key)
}
