//! Extension Manager
//! 
//! Owns the registry and wires the host, resolver and module loader into the
//! activation pipeline:
//! 
//! 1. Ask the host for the active extension records
//! 2. Resolve each descriptor's source location
//! 3. Load the module and construct its default export
//! 4. Register the instance
//! 
//! Activations run concurrently and fail independently. Host failures degrade
//! to empty results instead of propagating.

use std::sync::Arc;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde_json::Value;

use super::descriptor::ExtensionDescriptor;
use super::error::{ExtensionError, ExtensionResult};
use super::host::{HostEnvironment, InstallResponse};
use super::lifecycle::{LifecycleDispatcher, LifecyclePhase, LifecycleReport};
use super::loader::{LocationResolver, ModuleExport, ModuleLoader, NativeResolver};
use super::query::CapabilityQuery;
use super::registry::{ExtensionRef, ExtensionRegistry, SharedExtensionRegistry};
use super::types::ExtensionType;
use crate::notifications::{
    AsyncNotificationManager, ExtensionEvent, NotificationManager, NotificationResult, Publisher,
};

/// Result of activating one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Instance constructed and stored under `key`
    Registered { key: String },
    
    /// Module exported nothing constructible
    Skipped,
}

/// Per-descriptor results of a [`ExtensionManager::register_active`] pass
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub activated: Vec<(ExtensionDescriptor, String)>,
    pub skipped: Vec<ExtensionDescriptor>,
    pub failed: Vec<(ExtensionDescriptor, ExtensionError)>,
}

impl ActivationReport {
    /// Number of descriptors processed
    pub fn total(&self) -> usize {
        self.activated.len() + self.skipped.len() + self.failed.len()
    }
    
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
    
    fn record(&mut self, descriptor: ExtensionDescriptor, result: ExtensionResult<ActivationOutcome>) {
        match result {
            Ok(ActivationOutcome::Registered { key }) => self.activated.push((descriptor, key)),
            Ok(ActivationOutcome::Skipped) => self.skipped.push(descriptor),
            Err(e) => self.failed.push((descriptor, e)),
        }
    }
}

/// Result of an install request
#[derive(Debug)]
pub enum InstallOutcome {
    /// Host reported the install as cancelled
    Cancelled,
    
    /// No host, or the host call failed
    Unavailable,
    
    /// Descriptors of the installed extensions, after activation was attempted
    Installed(Vec<ExtensionDescriptor>),
}

/// Activation pipeline and capability query surface
pub struct ExtensionManager {
    registry: SharedExtensionRegistry,
    host: Option<Arc<dyn HostEnvironment>>,
    loader: Arc<dyn ModuleLoader>,
    resolver: Arc<dyn LocationResolver>,
    lifecycle: LifecycleDispatcher,
    events: Option<AsyncNotificationManager<ExtensionEvent>>,
}

impl ExtensionManager {
    /// Create a manager with an empty registry, no host and the native resolver
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        let registry = SharedExtensionRegistry::new();
        Self {
            lifecycle: LifecycleDispatcher::new(registry.clone()),
            registry,
            host: None,
            loader,
            resolver: Arc::new(NativeResolver),
            events: None,
        }
    }
    
    pub fn with_host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }
    
    pub fn with_resolver(mut self, resolver: Arc<dyn LocationResolver>) -> Self {
        self.resolver = resolver;
        self
    }
    
    /// Share an existing registry instead of the manager's own
    pub fn with_registry(mut self, registry: SharedExtensionRegistry) -> Self {
        self.lifecycle = LifecycleDispatcher::new(registry.clone());
        self.registry = registry;
        self
    }
    
    pub fn with_events(mut self, events: AsyncNotificationManager<ExtensionEvent>) -> Self {
        self.events = Some(events);
        self
    }
    
    pub fn registry(&self) -> &SharedExtensionRegistry {
        &self.registry
    }
    
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }
    
    /// Register an already constructed instance
    pub fn register(&self, name: &str, extension: ExtensionRef) -> String {
        let key = ExtensionRegistry::storage_key(name, extension.as_ref());
        self.registry.register(name, extension);
        key
    }
    
    async fn emit(&self, event: ExtensionEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.publish(event).await {
                debug!("Extension event not delivered: {}", e);
            }
        }
    }
    
    /// Descriptors of the extensions the host reports as active.
    ///
    /// Empty when there is no host, the host call fails, or the host returns
    /// something other than a list. Malformed records are skipped.
    pub async fn get_active(&self) -> Vec<ExtensionDescriptor> {
        let Some(host) = &self.host else {
            debug!("No host environment, no active extensions");
            return Vec::new();
        };
        
        let records = match host.get_active_extensions().await {
            Ok(Value::Array(records)) => records,
            Ok(other) => {
                warn!("Host returned a non-list for active extensions: {}", other);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to query active extensions: {}", e);
                return Vec::new();
            }
        };
        
        records.iter()
            .filter_map(|record| match ExtensionDescriptor::from_record(record) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!("Skipping extension record: {}", e);
                    None
                }
            })
            .collect()
    }
    
    /// Resolve, load, construct and register one extension.
    pub async fn activate_extension(&self, descriptor: &ExtensionDescriptor) -> ExtensionResult<ActivationOutcome> {
        let name = descriptor.registration_name();
        let location = self.resolver.resolve(descriptor);
        debug!("Activating '{}' from {}", name, location);
        
        let outcome = self.construct(descriptor, &location).await;
        match &outcome {
            Ok(ActivationOutcome::Registered { key }) => {
                info!("Activated extension '{}' as '{}'", name, key);
                self.emit(ExtensionEvent::registered(name, key.as_str())).await;
            }
            Ok(ActivationOutcome::Skipped) => {
                debug!("Module for '{}' has no constructible export, skipped", name);
                self.emit(ExtensionEvent::Skipped {
                    name: name.to_string(),
                    location,
                }).await;
            }
            Err(e) => {
                error!("Failed to activate extension '{}': {}", name, e);
                self.emit(ExtensionEvent::ActivationFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                }).await;
            }
        }
        outcome
    }
    
    async fn construct(&self, descriptor: &ExtensionDescriptor, location: &str) -> ExtensionResult<ActivationOutcome> {
        match self.loader.load(location).await? {
            ModuleExport::Constructible(factory) => {
                let instance = factory(descriptor)?;
                let key = self.register(descriptor.registration_name(), instance);
                Ok(ActivationOutcome::Registered { key })
            }
            ModuleExport::Value(_) => Ok(ActivationOutcome::Skipped),
        }
    }
    
    async fn activate_all(&self, descriptors: Vec<ExtensionDescriptor>) -> ActivationReport {
        let results = join_all(descriptors.iter().map(|d| self.activate_extension(d))).await;
        
        let mut report = ActivationReport::default();
        for (descriptor, result) in descriptors.into_iter().zip(results) {
            report.record(descriptor, result);
        }
        report
    }
    
    /// Activate every extension the host reports as active.
    pub async fn register_active(&self) -> ActivationReport {
        let descriptors = self.get_active().await;
        if descriptors.is_empty() {
            debug!("No active extensions to register");
            return ActivationReport::default();
        }
        
        let report = self.activate_all(descriptors).await;
        info!(
            "Registered {} extensions ({} skipped, {} failed)",
            report.activated.len(), report.skipped.len(), report.failed.len()
        );
        report
    }
    
    /// Ask the host to install `specs`, then activate what it installed.
    pub async fn install(&self, specs: &[String]) -> InstallOutcome {
        let Some(host) = &self.host else {
            warn!("No host environment, cannot install extensions");
            return InstallOutcome::Unavailable;
        };
        
        let records = match host.install_extension(specs).await {
            Ok(InstallResponse::Cancelled) => {
                info!("Extension install cancelled");
                return InstallOutcome::Cancelled;
            }
            Ok(InstallResponse::Installed(records)) => records,
            Err(e) => {
                error!("Failed to install extensions: {}", e);
                return InstallOutcome::Unavailable;
            }
        };
        
        let descriptors: Vec<ExtensionDescriptor> = records.iter()
            .filter_map(|record| match ExtensionDescriptor::from_record(record) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!("Skipping installed record: {}", e);
                    None
                }
            })
            .collect();
        
        let report = self.activate_all(descriptors.clone()).await;
        if !report.is_success() {
            warn!("{} installed extensions failed to activate", report.failed.len());
        }
        
        self.emit(ExtensionEvent::Installed {
            names: descriptors.iter().map(|d| d.registration_name().to_string()).collect(),
        }).await;
        InstallOutcome::Installed(descriptors)
    }
    
    /// Ask the host to uninstall `names`. The registry is left untouched;
    /// a reload rebuilds it from the host's new active set.
    pub async fn uninstall(&self, names: &[String], reload: bool) -> bool {
        let Some(host) = &self.host else {
            warn!("No host environment, cannot uninstall extensions");
            return false;
        };
        
        let success = match host.uninstall_extension(names, reload).await {
            Ok(success) => success,
            Err(e) => {
                error!("Failed to uninstall extensions: {}", e);
                false
            }
        };
        
        self.emit(ExtensionEvent::Uninstalled {
            names: names.to_vec(),
            success,
        }).await;
        success
    }
    
    /// Call `on_load` on every registered extension
    pub async fn load(&self) -> LifecycleReport {
        let report = self.lifecycle.load().await;
        self.emit_lifecycle(&report).await;
        report
    }
    
    /// Call `on_unload` on every registered extension
    pub async fn unload(&self) -> LifecycleReport {
        let report = self.lifecycle.unload().await;
        self.emit_lifecycle(&report).await;
        report
    }
    
    async fn emit_lifecycle(&self, report: &LifecycleReport) {
        if self.events.is_none() {
            return;
        }
        for (key, result) in &report.results {
            let event = match (result, report.phase) {
                (Err(e), _) => ExtensionEvent::LifecycleFailed { key: key.clone(), error: e.to_string() },
                (Ok(()), LifecyclePhase::Load) => ExtensionEvent::loaded(key.as_str()),
                (Ok(()), LifecyclePhase::Unload) => ExtensionEvent::unloaded(key.as_str()),
            };
            self.emit(event).await;
        }
    }
    
    /// Engine serving `provider`, matched on the provider field
    pub fn find_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.registry.find_engine(provider)
    }
}

impl CapabilityQuery for ExtensionManager {
    fn get(&self, ext_type: ExtensionType) -> Option<ExtensionRef> {
        self.registry.get(ext_type)
    }
    
    fn get_by_name(&self, name: &str) -> Option<ExtensionRef> {
        self.registry.get_by_name(name)
    }
    
    fn get_all(&self) -> Vec<ExtensionRef> {
        self.registry.get_all()
    }
    
    fn get_engine(&self, provider: &str) -> Option<ExtensionRef> {
        self.registry.get_engine(provider)
    }
}

#[async_trait]
impl Publisher<ExtensionEvent> for ExtensionManager {
    async fn publish(&self, event: ExtensionEvent) -> NotificationResult<()> {
        match &self.events {
            Some(events) => events.publish(event).await,
            None => Ok(()),
        }
    }
    
    fn publisher_id(&self) -> &str {
        "extension-manager"
    }
}
