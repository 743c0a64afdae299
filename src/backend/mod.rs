//! Backend update coordination
//!
//! Tracks whether the inference engine's backend has an update, drives the
//! update and install flows through the engine's [`BackendManager`] capability,
//! and keeps every observer of the update state in sync.
//!
//! [`BackendManager`]: crate::extension::BackendManager

pub mod error;
pub mod state;
pub mod store;
pub mod updater;
pub mod version;

pub use error::{BackendError, BackendResult};
pub use state::{BackendUpdateInfo, BackendUpdatePatch, BackendUpdateResult, BackendUpdateState};
pub use store::{BackendUpdateStore, StoreSync};
pub use updater::{BackendUpdater, AUTO_UPDATE_SETTING, DEFAULT_ENGINE_NAME, VERSION_SETTING};
pub use version::BackendVersion;
