//! Extension System
//! 
//! Discovery, activation and lifecycle management of extensions provided by
//! the host shell. Extensions are resolved from descriptors, loaded through a
//! [`ModuleLoader`], constructed and stored in a shared registry that callers
//! query by capability type, registration name or engine provider.

pub mod descriptor;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod query;
pub mod registry;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use descriptor::ExtensionDescriptor;
pub use error::{ExtensionError, ExtensionResult};
pub use host::{FileHost, HostEnvironment, InstallResponse, EXTENSIONS_MANIFEST};
pub use lifecycle::{LifecycleDispatcher, LifecyclePhase, LifecycleReport};
pub use loader::{
    ExtensionFactory, HttpResolver, LocationResolver, ModuleExport, ModuleLoader, NativeResolver,
    StaticModuleLoader, EXTENSION_SCHEME,
};
pub use manager::{ActivationOutcome, ActivationReport, ExtensionManager, InstallOutcome};
pub use query::CapabilityQuery;
pub use registry::{ExtensionRef, ExtensionRegistry, SharedExtensionRegistry};
pub use types::{
    find_setting, BackendManager, ControllerProps, EngineExtension, Extension, ExtensionSetting,
    ExtensionType,
};
