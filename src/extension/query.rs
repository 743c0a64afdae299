//! Capability Query Surface
//! 
//! The narrow lookup interface the rest of the application uses to obtain a
//! concrete collaborator without knowing its implementation. Tests substitute
//! their own implementation at this seam.

use super::registry::ExtensionRef;
use super::types::ExtensionType;

/// Typed lookups over the live extension set
pub trait CapabilityQuery: Send + Sync {
    /// Instance registered under a capability type
    fn get(&self, ext_type: ExtensionType) -> Option<ExtensionRef>;
    
    /// Instance registered under a name, independent of its declared type
    fn get_by_name(&self, name: &str) -> Option<ExtensionRef>;
    
    /// Every instance, in registration order
    fn get_all(&self) -> Vec<ExtensionRef>;
    
    /// Engine stored under `provider`. Shares storage with [`Self::get`], so an
    /// engine that declares a capability type is found under that type instead.
    fn get_engine(&self, provider: &str) -> Option<ExtensionRef>;
    
    /// Alias of [`Self::get_all`]
    fn list_extensions(&self) -> Vec<ExtensionRef> {
        self.get_all()
    }
}
