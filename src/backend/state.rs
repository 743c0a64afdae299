//! Backend update state and the partial updates merged into it.

use serde::{Deserialize, Deserializer, Serialize};

/// Result of asking the engine whether a newer backend exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUpdateInfo {
    pub update_needed: bool,
    pub new_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
}

impl BackendUpdateInfo {
    pub fn new(update_needed: bool, new_version: impl Into<String>) -> Self {
        Self {
            update_needed,
            new_version: new_version.into(),
            current_version: None,
        }
    }

    pub fn with_current_version(mut self, current: impl Into<String>) -> Self {
        self.current_version = Some(current.into());
        self
    }
}

/// Result reported by the engine after an update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUpdateResult {
    pub was_updated: bool,
    pub new_backend: String,
}

/// Observable update state shared by every updater handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUpdateState {
    pub is_update_available: bool,
    pub update_info: Option<BackendUpdateInfo>,
    pub is_updating: bool,
    pub remind_me_later: bool,
    pub auto_update_enabled: bool,
}

impl BackendUpdateState {
    /// Shallow merge: fields present in the patch overwrite, absent fields are kept.
    pub fn merge(&mut self, patch: &BackendUpdatePatch) {
        if let Some(value) = patch.is_update_available {
            self.is_update_available = value;
        }
        if let Some(value) = &patch.update_info {
            self.update_info = value.clone();
        }
        if let Some(value) = patch.is_updating {
            self.is_updating = value;
        }
        if let Some(value) = patch.remind_me_later {
            self.remind_me_later = value;
        }
        if let Some(value) = patch.auto_update_enabled {
            self.auto_update_enabled = value;
        }
    }
}

/// Partial [`BackendUpdateState`].
///
/// `update_info` is doubly optional so a patch can clear the info
/// (`Some(None)`, serialized as `null`) as distinct from leaving it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUpdatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_update_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub update_info: Option<Option<BackendUpdateInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_updating: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_me_later: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update_enabled: Option<bool>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BackendUpdatePatch {
    pub fn is_update_available(mut self, value: bool) -> Self {
        self.is_update_available = Some(value);
        self
    }

    pub fn update_info(mut self, value: Option<BackendUpdateInfo>) -> Self {
        self.update_info = Some(value);
        self
    }

    pub fn is_updating(mut self, value: bool) -> Self {
        self.is_updating = Some(value);
        self
    }

    pub fn remind_me_later(mut self, value: bool) -> Self {
        self.remind_me_later = Some(value);
        self
    }

    pub fn auto_update_enabled(mut self, value: bool) -> Self {
        self.auto_update_enabled = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
