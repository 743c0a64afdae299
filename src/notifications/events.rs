//! Notification Event Types
//! 
//! Events flowing through the bus. Each event carries a stable name that UI
//! surfaces and filters match on.

use serde::{Deserialize, Serialize};
use crate::backend::BackendUpdatePatch;

/// Base trait for all notification events
pub trait NotificationEvent: Send + Sync + Clone + std::fmt::Debug + 'static {
    /// Stable name of this event, used by [`EventFilter::Named`](crate::notifications::EventFilter)
    fn event_name(&self) -> &'static str;

    /// Human readable family name for log output
    fn kind() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Extension manager and backend updater events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ExtensionEvent {
    /// An extension instance entered the registry
    Registered {
        name: String,
        key: String,
    },

    /// A module loaded but exported no constructor
    Skipped {
        name: String,
        location: String,
    },

    /// Resolution, import or construction failed for one descriptor
    ActivationFailed {
        name: String,
        error: String,
    },

    /// An `on_load` hook completed
    Loaded {
        key: String,
    },

    /// An `on_unload` hook completed
    Unloaded {
        key: String,
    },

    /// A lifecycle hook failed
    LifecycleFailed {
        key: String,
        error: String,
    },

    /// Host installed packages and their extensions were activated
    Installed {
        names: Vec<String>,
    },

    /// Host processed an uninstall request
    Uninstalled {
        names: Vec<String>,
        success: bool,
    },

    /// Partial backend update state change to be merged by every observer
    BackendUpdateStateSync {
        patch: BackendUpdatePatch,
    },
}

impl ExtensionEvent {
    pub const BACKEND_UPDATE_STATE_SYNC: &'static str = "onBackendUpdateStateSync";

    pub fn registered(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Registered { name: name.into(), key: key.into() }
    }

    pub fn loaded(key: impl Into<String>) -> Self {
        Self::Loaded { key: key.into() }
    }

    pub fn unloaded(key: impl Into<String>) -> Self {
        Self::Unloaded { key: key.into() }
    }

    pub fn backend_state_sync(patch: BackendUpdatePatch) -> Self {
        Self::BackendUpdateStateSync { patch }
    }
}

impl NotificationEvent for ExtensionEvent {
    fn event_name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "onExtensionRegistered",
            Self::Skipped { .. } => "onExtensionSkipped",
            Self::ActivationFailed { .. } => "onActivationFailed",
            Self::Loaded { .. } => "onExtensionLoaded",
            Self::Unloaded { .. } => "onExtensionUnloaded",
            Self::LifecycleFailed { .. } => "onLifecycleFailed",
            Self::Installed { .. } => "onExtensionsInstalled",
            Self::Uninstalled { .. } => "onExtensionsUninstalled",
            Self::BackendUpdateStateSync { .. } => Self::BACKEND_UPDATE_STATE_SYNC,
        }
    }

    fn kind() -> &'static str {
        "extension"
    }
}
