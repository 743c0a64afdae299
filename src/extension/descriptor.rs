//! Extension Descriptors
//! 
//! Host-provided metadata identifying an extension before it is loaded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::error::{ExtensionError, ExtensionResult};

/// Immutable description of one installable extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDescriptor {
    /// URL or module specifier to load
    #[serde(rename = "url")]
    source_location: String,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    product_name: Option<String>,
    
    #[serde(default, rename = "active", skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl ExtensionDescriptor {
    /// Create a descriptor for a source location
    pub fn new<S: Into<String>>(source_location: S) -> Self {
        Self {
            source_location: source_location.into(),
            name: None,
            product_name: None,
            is_active: None,
            description: None,
            version: None,
        }
    }
    
    /// Set the logical name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
    
    /// Set the display name
    pub fn with_product_name<S: Into<String>>(mut self, product_name: S) -> Self {
        self.product_name = Some(product_name.into());
        self
    }
    
    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
    
    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
    
    /// Set the version
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }
    
    /// Build a descriptor from a host record.
    ///
    /// Accepts both `active` and the on-disk `_active` flag. Empty strings are
    /// treated as absent.
    pub fn from_record(record: &Value) -> ExtensionResult<Self> {
        let object = record.as_object()
            .ok_or_else(|| ExtensionError::malformed_descriptor(format!("expected an object, got {}", record)))?;
        
        let source_location = object.get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ExtensionError::malformed_descriptor("record has no url"))?;
        
        let text = |key: &str| {
            object.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        
        let is_active = object.get("active")
            .or_else(|| object.get("_active"))
            .and_then(Value::as_bool);
        
        Ok(Self {
            source_location: source_location.to_string(),
            name: text("name"),
            product_name: text("productName"),
            is_active,
            description: text("description"),
            version: text("version"),
        })
    }
    
    /// Source location to resolve and load
    pub fn source_location(&self) -> &str {
        &self.source_location
    }
    
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    
    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }
    
    pub fn is_active(&self) -> Option<bool> {
        self.is_active
    }
    
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
    
    /// Name to register under: the logical name, or the source location
    pub fn registration_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_name_fallback() {
        let named = ExtensionDescriptor::new("extension://conversational/index.js")
            .with_name("@janhq/conversational-extension");
        assert_eq!(named.registration_name(), "@janhq/conversational-extension");
        
        let unnamed = ExtensionDescriptor::new("extension://conversational/index.js");
        assert_eq!(unnamed.registration_name(), "extension://conversational/index.js");
    }
    
    #[test]
    fn test_from_record() {
        let record = json!({
            "url": "/data/extensions/llamacpp/dist/index.js",
            "name": "llamacpp-extension",
            "productName": "Llama.cpp Inference Engine",
            "_active": true,
            "description": "",
            "version": "1.0.0"
        });
        
        let descriptor = ExtensionDescriptor::from_record(&record).unwrap();
        assert_eq!(descriptor.source_location(), "/data/extensions/llamacpp/dist/index.js");
        assert_eq!(descriptor.name(), Some("llamacpp-extension"));
        assert_eq!(descriptor.product_name(), Some("Llama.cpp Inference Engine"));
        assert_eq!(descriptor.is_active(), Some(true));
        assert_eq!(descriptor.description(), None);
        assert_eq!(descriptor.version(), Some("1.0.0"));
    }
    
    #[test]
    fn test_from_record_requires_url() {
        assert!(ExtensionDescriptor::from_record(&json!({"name": "x"})).is_err());
        assert!(ExtensionDescriptor::from_record(&json!({"url": ""})).is_err());
        assert!(ExtensionDescriptor::from_record(&json!("not an object")).is_err());
    }
    
    #[test]
    fn test_serde_uses_host_field_names() {
        let descriptor = ExtensionDescriptor::new("extension://a/index.js")
            .with_name("a")
            .with_product_name("A")
            .with_active(false);
        
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["url"], "extension://a/index.js");
        assert_eq!(json["productName"], "A");
        assert_eq!(json["active"], false);
        assert!(json.get("version").is_none());
    }
}
