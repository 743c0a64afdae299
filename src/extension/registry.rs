//! Extension Registry
//! 
//! Stores live extension instances and answers lookups by capability type,
//! registration name and engine provider.
//!
//! Two independent maps are kept. The typed map is keyed by the instance's
//! declared capability type, or by the registration name when it declares none.
//! The name map is always keyed by the registration name. The two can disagree:
//! an instance replaced in the typed map stays reachable by its name.

use std::sync::Arc;
use indexmap::IndexMap;
use log::{debug, warn};
use parking_lot::RwLock;
use super::query::CapabilityQuery;
use super::types::{Extension, ExtensionType};

/// Shared handle to a live extension
pub type ExtensionRef = Arc<dyn Extension>;

/// Registry of live extension instances
#[derive(Default)]
pub struct ExtensionRegistry {
    /// Instances keyed by capability type, falling back to registration name
    extensions: IndexMap<String, ExtensionRef>,
    
    /// Instances keyed by registration name
    by_name: IndexMap<String, ExtensionRef>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Storage key for an instance registered under `name`
    pub fn storage_key(name: &str, extension: &dyn Extension) -> String {
        extension.extension_type()
            .map(|ext_type| ext_type.to_string())
            .unwrap_or_else(|| name.to_string())
    }
    
    /// Register an extension. A previous entry under the same key is replaced
    /// and returned; the replacement keeps the original iteration slot.
    pub fn register(&mut self, name: &str, extension: ExtensionRef) -> Option<ExtensionRef> {
        let key = Self::storage_key(name, extension.as_ref());
        
        if let Some(previous) = self.by_name.insert(name.to_string(), Arc::clone(&extension)) {
            if !Arc::ptr_eq(&previous, &extension) {
                debug!("Extension name '{}' re-registered with a new instance", name);
            }
        }
        
        let replaced = self.extensions.insert(key.clone(), extension);
        match &replaced {
            Some(previous) => warn!(
                "Extension '{}' replaced '{}' under key '{}'",
                name, previous.name(), key
            ),
            None => debug!("Registered extension '{}' under key '{}'", name, key),
        }
        replaced
    }
    
    /// Look up by capability type
    pub fn get(&self, ext_type: ExtensionType) -> Option<ExtensionRef> {
        self.extensions.get(ext_type.as_str()).cloned()
    }
    
    /// Look up by raw storage key
    pub fn get_by_key(&self, key: &str) -> Option<ExtensionRef> {
        self.extensions.get(key).cloned()
    }
    
    /// Look up by the name used at registration time
    pub fn get_by_name(&self, name: &str) -> Option<ExtensionRef> {
        self.by_name.get(name).cloned()
    }
    
    /// Look up an engine in the typed map using the provider as the key.
    ///
    /// Engines are not indexed by provider. An engine that declares a capability
    /// type is stored under that type, so this only finds engines whose storage
    /// key happens to equal the provider. Use [`Self::find_engine`] to match on
    /// the provider field itself.
    pub fn get_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.extensions.get(provider)
            .filter(|extension| extension.as_engine().is_some())
            .cloned()
    }
    
    /// Scan registered engines for one serving `provider`
    pub fn find_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.extensions.values()
            .find(|extension| {
                extension.as_engine()
                    .map(|engine| engine.provider() == provider)
                    .unwrap_or(false)
            })
            .cloned()
    }
    
    /// All registered engines in iteration order
    pub fn engines(&self) -> Vec<ExtensionRef> {
        self.extensions.values()
            .filter(|extension| extension.as_engine().is_some())
            .cloned()
            .collect()
    }
    
    /// All instances in the typed map, in insertion order
    pub fn get_all(&self) -> Vec<ExtensionRef> {
        self.extensions.values().cloned().collect()
    }
    
    /// Alias of [`Self::get_all`] used by the lifecycle dispatcher
    pub fn list_extensions(&self) -> Vec<ExtensionRef> {
        self.get_all()
    }
    
    /// Storage keys paired with their instances, in insertion order
    pub fn entries(&self) -> Vec<(String, ExtensionRef)> {
        self.extensions.iter()
            .map(|(key, extension)| (key.clone(), Arc::clone(extension)))
            .collect()
    }
    
    /// Check whether a storage key is occupied
    pub fn contains_key(&self, key: &str) -> bool {
        self.extensions.contains_key(key)
    }
    
    /// Number of instances in the typed map
    pub fn len(&self) -> usize {
        self.extensions.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Registry handle shared between the activation pipeline and its readers.
///
/// Locks are held only for the duration of a single map operation and never
/// across an await point, so readers may observe a registry that is still
/// being filled by an activation batch.
#[derive(Clone, Default)]
pub struct SharedExtensionRegistry {
    inner: Arc<RwLock<ExtensionRegistry>>,
}

impl SharedExtensionRegistry {
    /// Create a new shared registry
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Get the inner registry for direct access
    pub fn inner(&self) -> &Arc<RwLock<ExtensionRegistry>> {
        &self.inner
    }
    
    /// Register an extension, see [`ExtensionRegistry::register`]
    pub fn register(&self, name: &str, extension: ExtensionRef) -> Option<ExtensionRef> {
        self.inner.write().register(name, extension)
    }
    
    pub fn list_extensions(&self) -> Vec<ExtensionRef> {
        self.inner.read().list_extensions()
    }
    
    pub fn entries(&self) -> Vec<(String, ExtensionRef)> {
        self.inner.read().entries()
    }
    
    pub fn find_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.inner.read().find_engine(provider)
    }
    
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl CapabilityQuery for SharedExtensionRegistry {
    fn get(&self, ext_type: ExtensionType) -> Option<ExtensionRef> {
        self.inner.read().get(ext_type)
    }
    
    fn get_by_name(&self, name: &str) -> Option<ExtensionRef> {
        self.inner.read().get_by_name(name)
    }
    
    fn get_all(&self) -> Vec<ExtensionRef> {
        self.inner.read().get_all()
    }
    
    fn get_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.inner.read().get_engine(provider)
    }
}
