//! Backend Updater
//!
//! Drives the check, update and install flows against the inference engine
//! extension. Every handle writes through the same [`BackendUpdateStore`], so
//! two updaters observing one engine always agree on the state.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::state::{BackendUpdateInfo, BackendUpdatePatch, BackendUpdateState};
use crate::backend::store::BackendUpdateStore;
use crate::backend::version::BackendVersion;
use crate::extension::{find_setting, BackendManager, CapabilityQuery, ExtensionRef, ExtensionSetting};

/// Registration name of the inference engine extension
pub const DEFAULT_ENGINE_NAME: &str = "llamacpp-extension";

/// Setting holding the active backend, `<release>/<type>`
pub const VERSION_SETTING: &str = "version_backend";

/// Setting enabling unattended backend updates
pub const AUTO_UPDATE_SETTING: &str = "auto_update_engine";

#[derive(Clone)]
pub struct BackendUpdater {
    query: Arc<dyn CapabilityQuery>,
    store: BackendUpdateStore,
    engine_name: String,
}

impl BackendUpdater {
    pub fn new(query: Arc<dyn CapabilityQuery>, store: BackendUpdateStore) -> Self {
        Self {
            query,
            store,
            engine_name: DEFAULT_ENGINE_NAME.to_string(),
        }
    }

    pub fn with_engine_name(mut self, engine_name: impl Into<String>) -> Self {
        self.engine_name = engine_name.into();
        self
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn store(&self) -> &BackendUpdateStore {
        &self.store
    }

    pub fn state(&self) -> BackendUpdateState {
        self.store.snapshot()
    }

    /// Engine registered under the configured name, otherwise the first
    /// extension that looks like a llama.cpp or inference engine.
    pub fn locate_engine(&self) -> Option<ExtensionRef> {
        if let Some(engine) = self.query.get_by_name(&self.engine_name) {
            return Some(engine);
        }

        let fallback = self.query.get_all().into_iter().find(|extension| {
            let name = extension.name().to_lowercase();
            let is_inference = extension
                .extension_type()
                .map(|t| t.as_str().to_lowercase().contains("inference"))
                .unwrap_or(false);
            name.contains("llamacpp") || is_inference
        });
        if let Some(engine) = &fallback {
            debug!("Engine '{}' not registered by name, using '{}'", self.engine_name, engine.name());
        }
        fallback
    }

    fn backend_manager<'a>(&self, engine: &'a ExtensionRef) -> BackendResult<&'a dyn BackendManager> {
        engine
            .as_backend_manager()
            .ok_or_else(|| BackendError::unsupported(engine.name(), "backend management"))
    }

    fn engine(&self) -> BackendResult<ExtensionRef> {
        self.locate_engine()
            .ok_or_else(|| BackendError::EngineNotFound(self.engine_name.clone()))
    }

    async fn settings(&self, manager: &dyn BackendManager) -> BackendResult<Vec<ExtensionSetting>> {
        Ok(manager.get_settings().await?)
    }

    /// Ask the engine whether a newer backend exists.
    ///
    /// Returns the update info only when an update is needed. A found update
    /// also clears the reminder. Failures are logged and leave the state
    /// marked as "no update available".
    pub async fn check_for_update(&self, reset_remind_me_later: bool) -> Option<BackendUpdateInfo> {
        if reset_remind_me_later {
            self.set_remind_me_later(false).await;
        }

        let engine = match self.engine() {
            Ok(engine) => engine,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };
        let manager = match self.backend_manager(&engine) {
            Ok(manager) => manager,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };

        let no_update = BackendUpdatePatch::default()
            .is_update_available(false)
            .update_info(None);

        match manager.check_backend_for_updates().await {
            Ok(info) if info.update_needed => {
                info!("Backend update available: {}", info.new_version);
                self.store
                    .apply(
                        BackendUpdatePatch::default()
                            .is_update_available(true)
                            .remind_me_later(false)
                            .update_info(Some(info.clone())),
                    )
                    .await;
                Some(info)
            }
            Ok(_) => {
                debug!("Backend is up to date");
                self.store.apply(no_update).await;
                None
            }
            Err(e) => {
                error!("Error checking for backend updates: {}", e);
                self.store.apply(no_update).await;
                None
            }
        }
    }

    /// Install the pending update. A no-op when no update is known.
    pub async fn update_backend(&self) -> BackendResult<()> {
        let Some(info) = self.store.snapshot().update_info else {
            debug!("No pending backend update");
            return Ok(());
        };

        self.store.apply(BackendUpdatePatch::default().is_updating(true)).await;

        match self.perform_update(&info).await {
            Ok(new_backend) => {
                info!("Backend updated to {}", new_backend);
                self.store
                    .apply(
                        BackendUpdatePatch::default()
                            .is_update_available(false)
                            .update_info(None)
                            .is_updating(false),
                    )
                    .await;
                Ok(())
            }
            Err(e) => {
                error!("Error updating backend: {}", e);
                self.store.apply(BackendUpdatePatch::default().is_updating(false)).await;
                Err(e)
            }
        }
    }

    async fn perform_update(&self, info: &BackendUpdateInfo) -> BackendResult<String> {
        let engine = self.engine()?;
        let manager = self.backend_manager(&engine)?;

        let settings = self.settings(manager).await?;
        let current = find_setting(&settings, VERSION_SETTING)
            .and_then(|setting| setting.value())
            .and_then(Value::as_str)
            .ok_or(BackendError::CurrentBackendNotFound)?;

        let target = current.parse::<BackendVersion>()?.with_release(&info.new_version);
        debug!("Updating backend {} -> {}", current, target);

        let result = manager.update_backend(&target.to_string()).await?;
        if !result.was_updated {
            return Err(BackendError::UpdateFailed(format!(
                "engine did not apply {}",
                target
            )));
        }
        Ok(result.new_backend)
    }

    /// Install a backend archive from disk and reconfigure the engine.
    pub async fn install_backend(&self, file_path: &str) -> BackendResult<()> {
        let engine = self.engine()?;
        let manager = self.backend_manager(&engine)?;

        manager.install_backend(file_path).await?;
        manager.configure_backends().await?;
        info!("Installed backend from {}", file_path);
        Ok(())
    }

    pub async fn set_remind_me_later(&self, remind: bool) {
        self.store.apply(BackendUpdatePatch::default().remind_me_later(remind)).await;
    }

    /// Re-read the engine's auto update setting into the shared state.
    pub async fn refresh_auto_update_setting(&self) -> bool {
        let enabled = match self.read_auto_update().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!("Failed to read auto update setting: {}", e);
                false
            }
        };
        self.store
            .apply(BackendUpdatePatch::default().auto_update_enabled(enabled))
            .await;
        enabled
    }

    async fn read_auto_update(&self) -> BackendResult<bool> {
        let engine = self.engine()?;
        let manager = self.backend_manager(&engine)?;
        let settings = self.settings(manager).await?;
        Ok(find_setting(&settings, AUTO_UPDATE_SETTING)
            .and_then(|setting| setting.value())
            .map(|value| *value == Value::Bool(true))
            .unwrap_or(false))
    }
}

impl std::fmt::Debug for BackendUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendUpdater")
            .field("engine_name", &self.engine_name)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::backend::StoreSync;
    use crate::extension::tests::mock_extensions::*;
    use crate::extension::{ExtensionType, SharedExtensionRegistry};
    use crate::notifications::{AsyncNotificationManager, ExtensionEvent, NotificationManager};

    fn registry_with(engine: Arc<MockBackendEngine>) -> SharedExtensionRegistry {
        let registry = SharedExtensionRegistry::new();
        registry.register(DEFAULT_ENGINE_NAME, engine);
        registry
    }

    fn updater_for(registry: &SharedExtensionRegistry) -> BackendUpdater {
        BackendUpdater::new(Arc::new(registry.clone()), BackendUpdateStore::new())
    }

    #[tokio::test]
    async fn test_check_marks_update_available() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        let updater = updater_for(&registry_with(engine));
        updater.set_remind_me_later(true).await;

        let info = updater.check_for_update(true).await.unwrap();

        assert_eq!(info.new_version, "b3300");
        let state = updater.state();
        assert!(state.is_update_available);
        assert!(!state.remind_me_later);
        assert_eq!(state.update_info, Some(info));
    }

    #[tokio::test]
    async fn test_found_update_clears_reminder_without_reset() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        let updater = updater_for(&registry_with(engine));
        updater.set_remind_me_later(true).await;

        updater.check_for_update(false).await.unwrap();

        let state = updater.state();
        assert!(state.is_update_available);
        assert!(!state.remind_me_later);
    }

    #[tokio::test]
    async fn test_reminder_kept_when_no_update_or_check_fails() {
        let up_to_date = updater_for(&registry_with(Arc::new(MockBackendEngine::new("llamacpp"))));
        up_to_date.set_remind_me_later(true).await;
        assert!(up_to_date.check_for_update(false).await.is_none());
        assert!(up_to_date.state().remind_me_later);

        let failing = updater_for(&registry_with(Arc::new(MockBackendEngine::new("llamacpp").failing_check())));
        failing.set_remind_me_later(true).await;
        assert!(failing.check_for_update(false).await.is_none());
        assert!(failing.state().remind_me_later);
    }

    #[tokio::test]
    async fn test_reset_applies_before_engine_lookup() {
        let updater = updater_for(&SharedExtensionRegistry::new());
        updater.set_remind_me_later(true).await;

        assert!(updater.check_for_update(true).await.is_none());
        assert!(!updater.state().remind_me_later);
    }

    #[tokio::test]
    async fn test_check_failure_clears_availability() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").failing_check());
        let updater = updater_for(&registry_with(engine));
        updater
            .store()
            .apply(BackendUpdatePatch::default().is_update_available(true))
            .await;

        assert!(updater.check_for_update(false).await.is_none());
        assert!(!updater.state().is_update_available);
        assert!(updater.state().update_info.is_none());
    }

    #[tokio::test]
    async fn test_check_up_to_date_returns_none() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp"));
        let updater = updater_for(&registry_with(engine));
        assert!(updater.check_for_update(false).await.is_none());
        assert!(!updater.state().is_update_available);
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let updater = updater_for(&SharedExtensionRegistry::new());
        assert!(updater.check_for_update(true).await.is_none());
        assert_eq!(
            updater.install_backend("/tmp/backend.tar.gz").await,
            Err(BackendError::EngineNotFound(DEFAULT_ENGINE_NAME.to_string()))
        );
    }

    #[tokio::test]
    async fn test_locate_engine_fallbacks() {
        let registry = SharedExtensionRegistry::new();
        registry.register("@vendor/llamacpp-next", Arc::new(MockExtension::new("LlamaCpp-Next")));
        let updater = updater_for(&registry);
        assert_eq!(updater.locate_engine().unwrap().name(), "LlamaCpp-Next");

        let registry = SharedExtensionRegistry::new();
        registry.register("runner", Arc::new(MockExtension::new("runner").with_type(ExtensionType::Inference)));
        assert_eq!(updater_for(&registry).locate_engine().unwrap().name(), "runner");

        let registry = SharedExtensionRegistry::new();
        registry.register("rag", Arc::new(MockExtension::new("rag").with_type(ExtensionType::Rag)));
        assert!(updater_for(&registry).locate_engine().is_none());
    }

    #[tokio::test]
    async fn test_configured_engine_name() {
        let registry = SharedExtensionRegistry::new();
        registry.register("custom-engine", Arc::new(MockBackendEngine::new("custom")));
        let updater = updater_for(&registry).with_engine_name("custom-engine");
        assert_eq!(updater.engine_name(), "custom-engine");
        assert_eq!(updater.locate_engine().unwrap().name(), "custom");
    }

    #[tokio::test]
    async fn test_update_rebuilds_target_backend() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        let updater = updater_for(&registry_with(engine.clone()));
        updater.check_for_update(true).await;

        updater.update_backend().await.unwrap();

        assert_eq!(engine.updates(), vec!["b3300/cuda12"]);
        let state = updater.state();
        assert!(!state.is_updating);
        assert!(!state.is_update_available);
        assert!(state.update_info.is_none());
    }

    #[tokio::test]
    async fn test_update_without_pending_info_is_noop() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp"));
        let updater = updater_for(&registry_with(engine.clone()));

        updater.update_backend().await.unwrap();
        assert!(engine.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_refused_resets_updating() {
        let engine = Arc::new(
            MockBackendEngine::new("llamacpp")
                .with_update_available("b3300")
                .refusing_update(),
        );
        let updater = updater_for(&registry_with(engine));
        updater.check_for_update(false).await;

        let result = updater.update_backend().await;

        assert!(matches!(result, Err(BackendError::UpdateFailed(_))));
        let state = updater.state();
        assert!(!state.is_updating);
        assert!(state.is_update_available);
    }

    #[tokio::test]
    async fn test_update_without_current_backend() {
        let engine = Arc::new(
            MockBackendEngine::new("llamacpp")
                .with_update_available("b3300")
                .with_settings(Vec::new()),
        );
        let updater = updater_for(&registry_with(engine));
        updater.check_for_update(false).await;

        assert_eq!(updater.update_backend().await, Err(BackendError::CurrentBackendNotFound));
        assert!(!updater.state().is_updating);
    }

    #[tokio::test]
    async fn test_update_rejects_malformed_current_backend() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        engine.set_setting(VERSION_SETTING, json!("b3224"));
        let updater = updater_for(&registry_with(engine.clone()));
        updater.check_for_update(false).await;

        assert_eq!(
            updater.update_backend().await,
            Err(BackendError::InvalidVersion("b3224".to_string()))
        );
        assert!(engine.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_on_engine_without_backend_manager() {
        let registry = SharedExtensionRegistry::new();
        registry.register(DEFAULT_ENGINE_NAME, Arc::new(MockEngine::new("llamacpp", "llamacpp")));
        let updater = updater_for(&registry);
        updater
            .store()
            .apply(BackendUpdatePatch::default().update_info(Some(BackendUpdateInfo::new(true, "b1"))))
            .await;

        assert!(matches!(
            updater.update_backend().await,
            Err(BackendError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_then_configure() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp"));
        let updater = updater_for(&registry_with(engine.clone()));

        updater.install_backend("/tmp/llama-b3300-bin-cuda12.tar.gz").await.unwrap();

        assert_eq!(engine.installs(), vec!["/tmp/llama-b3300-bin-cuda12.tar.gz"]);
        assert_eq!(engine.configure_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_auto_update_setting() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp"));
        let updater = updater_for(&registry_with(engine.clone()));
        assert!(!updater.refresh_auto_update_setting().await);

        engine.set_setting(AUTO_UPDATE_SETTING, json!(true));
        assert!(updater.refresh_auto_update_setting().await);
        assert!(updater.state().auto_update_enabled);

        engine.set_setting(AUTO_UPDATE_SETTING, json!("true"));
        assert!(!updater.refresh_auto_update_setting().await);
    }

    #[tokio::test]
    async fn test_handles_sharing_a_store_agree() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        let registry = registry_with(engine);
        let a = updater_for(&registry);
        let b = BackendUpdater::new(Arc::new(registry.clone()), a.store().clone());

        a.check_for_update(true).await;
        assert_eq!(a.state(), b.state());
        assert!(b.state().is_update_available);
    }

    #[tokio::test]
    async fn test_separate_stores_converge_over_bus() {
        let engine = Arc::new(MockBackendEngine::new("llamacpp").with_update_available("b3300"));
        let registry = registry_with(engine);
        let bus = AsyncNotificationManager::<ExtensionEvent>::new();

        let a = BackendUpdater::new(Arc::new(registry.clone()), BackendUpdateStore::new().with_events(bus.clone()));
        let b_store = BackendUpdateStore::new();
        bus.subscribe(Arc::new(StoreSync::new("b", b_store.clone()))).await.unwrap();
        let b = BackendUpdater::new(Arc::new(registry), b_store);

        a.check_for_update(true).await;

        let state = b.state();
        assert!(state.is_update_available);
        assert!(!state.remind_me_later);
        assert_eq!(state.update_info.unwrap().new_version, "b3300");
        assert_eq!(a.state(), b.state());
    }
}
