//! Lifecycle Dispatcher
//! 
//! Calls `on_load`/`on_unload` on every registered extension in registry order.
//! Each call is isolated: a failing extension is recorded in the report and the
//! remaining extensions are still visited.

use log::{debug, error, info};
use super::error::{ExtensionError, ExtensionResult};
use super::registry::{ExtensionRef, SharedExtensionRegistry};

/// Lifecycle phase being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Load,
    Unload,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Load => f.write_str("load"),
            LifecyclePhase::Unload => f.write_str("unload"),
        }
    }
}

/// Outcome of one lifecycle pass, in visiting order
#[derive(Debug, Clone)]
pub struct LifecycleReport {
    pub phase: LifecyclePhase,
    pub results: Vec<(String, ExtensionResult<()>)>,
}

impl LifecycleReport {
    fn new(phase: LifecyclePhase) -> Self {
        Self { phase, results: Vec::new() }
    }
    
    /// Number of extensions whose hook succeeded
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, result)| result.is_ok()).count()
    }
    
    /// Extensions whose hook failed
    pub fn failures(&self) -> Vec<(&str, &ExtensionError)> {
        self.results.iter()
            .filter_map(|(key, result)| result.as_ref().err().map(|e| (key.as_str(), e)))
            .collect()
    }
    
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }
}

/// Dispatches lifecycle hooks over a registry
#[derive(Clone)]
pub struct LifecycleDispatcher {
    registry: SharedExtensionRegistry,
}

impl LifecycleDispatcher {
    pub fn new(registry: SharedExtensionRegistry) -> Self {
        Self { registry }
    }
    
    /// Call `on_load` on every registered extension
    pub async fn load(&self) -> LifecycleReport {
        self.dispatch(LifecyclePhase::Load).await
    }
    
    /// Call `on_unload` on every registered extension
    pub async fn unload(&self) -> LifecycleReport {
        self.dispatch(LifecyclePhase::Unload).await
    }
    
    async fn dispatch(&self, phase: LifecyclePhase) -> LifecycleReport {
        // Snapshot so no lock is held while hooks run
        let entries = self.registry.entries();
        let mut report = LifecycleReport::new(phase);
        
        debug!("Dispatching {} to {} extensions", phase, entries.len());
        
        for (key, extension) in entries {
            let result = Self::invoke(phase, &extension).await
                .map_err(|e| ExtensionError::lifecycle_failed(extension.name(), e.to_string()));
            
            if let Err(e) = &result {
                error!("Extension '{}' failed to {}: {}", key, phase, e);
            }
            report.results.push((key, result));
        }
        
        info!("{} complete: {}/{} extensions succeeded", phase, report.succeeded(), report.results.len());
        report
    }
    
    async fn invoke(phase: LifecyclePhase, extension: &ExtensionRef) -> ExtensionResult<()> {
        match phase {
            LifecyclePhase::Load => extension.on_load().await,
            LifecyclePhase::Unload => extension.on_unload().await,
        }
    }
}
