//! Extension Module Loading
//! 
//! Resolves a descriptor's source location to a loadable path and loads the
//! module behind it. Location rewriting is a host concern and is provided as a
//! pluggable `LocationResolver`.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use async_trait::async_trait;
use log::trace;
use super::descriptor::ExtensionDescriptor;
use super::error::{ExtensionError, ExtensionResult};
use super::registry::ExtensionRef;

/// Scheme used by hosts for bundled extension locations
pub const EXTENSION_SCHEME: &str = "extension://";

/// Maps a descriptor to the location the loader should use
pub trait LocationResolver: Send + Sync {
    fn resolve(&self, descriptor: &ExtensionDescriptor) -> String;
}

/// Native shell: locations are used as given
#[derive(Debug, Clone, Default)]
pub struct NativeResolver;

impl LocationResolver for NativeResolver {
    fn resolve(&self, descriptor: &ExtensionDescriptor) -> String {
        descriptor.source_location().to_string()
    }
}

/// Outside the native shell: locations are served over HTTP from
/// `<base_url>/extensions/`
#[derive(Debug, Clone)]
pub struct HttpResolver {
    base_url: String,
    extensions_dir: Option<PathBuf>,
}

impl HttpResolver {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            extensions_dir: None,
        }
    }
    
    /// Also rewrite absolute paths below the host's extensions directory
    pub fn with_extensions_dir(mut self, dir: PathBuf) -> Self {
        self.extensions_dir = Some(dir);
        self
    }
    
    fn served(&self, relative: &str) -> String {
        format!("{}/extensions/{}", self.base_url, relative.trim_start_matches('/'))
    }
}

impl LocationResolver for HttpResolver {
    fn resolve(&self, descriptor: &ExtensionDescriptor) -> String {
        let location = descriptor.source_location();
        
        if let Some(relative) = location.strip_prefix(EXTENSION_SCHEME) {
            return self.served(relative);
        }
        
        if let Some(dir) = &self.extensions_dir {
            if let Ok(relative) = std::path::Path::new(location).strip_prefix(dir) {
                let relative = relative.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                return self.served(&relative);
            }
        }
        
        location.to_string()
    }
}

/// Constructor for an extension instance
pub type ExtensionFactory = Arc<dyn Fn(&ExtensionDescriptor) -> ExtensionResult<ExtensionRef> + Send + Sync>;

/// What a loaded module exports by default
#[derive(Clone)]
pub enum ModuleExport {
    /// A constructible extension
    Constructible(ExtensionFactory),
    
    /// Anything else; activation skips these
    Value(serde_json::Value),
}

impl ModuleExport {
    /// Wrap a constructor closure
    pub fn class<F>(factory: F) -> Self
    where
        F: Fn(&ExtensionDescriptor) -> ExtensionResult<ExtensionRef> + Send + Sync + 'static,
    {
        ModuleExport::Constructible(Arc::new(factory))
    }
    
    pub fn is_constructible(&self) -> bool {
        matches!(self, ModuleExport::Constructible(_))
    }
}

impl fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleExport::Constructible(_) => f.write_str("Constructible(..)"),
            ModuleExport::Value(value) => write!(f, "Value({})", value),
        }
    }
}

/// Loads the module at a resolved location
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, location: &str) -> ExtensionResult<ModuleExport>;
}

/// Loader backed by a table of compiled-in modules.
///
/// Modules are matched by exact resolved location first, then by package name
/// against the path segments of the location, with `@scope/name` spanning two.
#[derive(Default, Clone)]
pub struct StaticModuleLoader {
    modules: HashMap<String, ModuleExport>,
    packages: HashMap<String, ModuleExport>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Register a module under its exact location
    pub fn with_module<S: Into<String>>(mut self, location: S, export: ModuleExport) -> Self {
        self.modules.insert(location.into(), export);
        self
    }
    
    /// Register a module under a package name
    pub fn with_package<S: Into<String>>(mut self, package: S, export: ModuleExport) -> Self {
        self.packages.insert(package.into(), export);
        self
    }
    
    fn find(&self, location: &str) -> Option<&ModuleExport> {
        if let Some(export) = self.modules.get(location) {
            return Some(export);
        }
        
        let path = location.split_once("://").map(|(_, rest)| rest).unwrap_or(location);
        let segments: Vec<&str> = path.split(|c| c == '/' || c == '\\')
            .filter(|segment| !segment.is_empty())
            .collect();
        
        segments.iter().enumerate().find_map(|(i, segment)| {
            // Scoped packages span two segments: `@scope/name`
            let scoped = match segments.get(i + 1) {
                Some(next) if segment.starts_with('@') => self.packages.get(&format!("{}/{}", segment, next)),
                _ => None,
            };
            scoped.or_else(|| self.packages.get(*segment))
        })
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, location: &str) -> ExtensionResult<ModuleExport> {
        trace!("Loading module from '{}'", location);
        self.find(location)
            .cloned()
            .ok_or_else(|| ExtensionError::module_not_found(location))
    }
}
