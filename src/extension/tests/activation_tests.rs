//! Activation pipeline tests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::json;

use crate::extension::*;
use crate::extension::tests::mock_extensions::*;
use crate::notifications::{AsyncNotificationManager, CallbackSubscriber, ExtensionEvent, NotificationEvent, NotificationManager};

/// Loader that sleeps a per-location delay before delegating
struct DelayedLoader {
    inner: StaticModuleLoader,
    delays: HashMap<String, Duration>,
}

#[async_trait]
impl ModuleLoader for DelayedLoader {
    async fn load(&self, location: &str) -> ExtensionResult<ModuleExport> {
        if let Some(delay) = self.delays.get(location) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.load(location).await
    }
}

fn manager_with(host: MockHost, loader: StaticModuleLoader) -> ExtensionManager {
    ExtensionManager::new(Arc::new(loader)).with_host(Arc::new(host))
}

#[tokio::test]
async fn test_get_active_without_host_is_empty() {
    let manager = ExtensionManager::new(Arc::new(StaticModuleLoader::new()));
    assert!(!manager.has_host());
    assert!(manager.get_active().await.is_empty());
    assert_eq!(manager.register_active().await.total(), 0);
}

#[tokio::test]
async fn test_get_active_degrades_on_host_failure() {
    let manager = manager_with(MockHost::new().failing_active(), StaticModuleLoader::new());
    assert!(manager.get_active().await.is_empty());
}

#[tokio::test]
async fn test_get_active_degrades_on_non_list() {
    let manager = manager_with(
        MockHost::new().with_active(json!({ "url": "a" })),
        StaticModuleLoader::new(),
    );
    assert!(manager.get_active().await.is_empty());
}

#[tokio::test]
async fn test_get_active_skips_malformed_records() {
    let manager = manager_with(
        MockHost::new().with_active(json!([
            record("/ext/a/index.js", "a"),
            { "name": "no-url" },
            "not a record",
            { "url": "/ext/b/index.js", "_active": true, "productName": "B", "version": "1.0.0" },
        ])),
        StaticModuleLoader::new(),
    );
    
    let active = manager.get_active().await;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].name(), Some("a"));
    assert_eq!(active[1].registration_name(), "/ext/b/index.js");
    assert_eq!(active[1].product_name(), Some("B"));
}

#[tokio::test]
async fn test_activate_registers_under_type_and_name() {
    let loader = StaticModuleLoader::new()
        .with_module("/ext/conv/index.js", mock_class(Some(ExtensionType::Conversational)));
    let manager = ExtensionManager::new(Arc::new(loader));
    let descriptor = ExtensionDescriptor::new("/ext/conv/index.js").with_name("@janhq/conversational-extension");
    
    let outcome = manager.activate_extension(&descriptor).await.unwrap();
    
    assert_eq!(outcome, ActivationOutcome::Registered { key: "conversational".to_string() });
    let by_type = manager.get(ExtensionType::Conversational).unwrap();
    let by_name = manager.get_by_name("@janhq/conversational-extension").unwrap();
    assert!(Arc::ptr_eq(&by_type, &by_name));
}

#[tokio::test]
async fn test_activate_falls_back_to_location_as_name() {
    let loader = StaticModuleLoader::new().with_module("/ext/anon/index.js", mock_class(None));
    let manager = ExtensionManager::new(Arc::new(loader));
    
    manager.activate_extension(&ExtensionDescriptor::new("/ext/anon/index.js")).await.unwrap();
    
    assert!(manager.get_by_name("/ext/anon/index.js").is_some());
    assert_eq!(manager.get_by_name("/ext/anon/index.js").unwrap().name(), "/ext/anon/index.js");
}

#[tokio::test]
async fn test_activate_uses_resolver() {
    let loader = StaticModuleLoader::new()
        .with_module("http://localhost:1337/extensions/rag/index.js", mock_class(Some(ExtensionType::Rag)));
    let manager = ExtensionManager::new(Arc::new(loader))
        .with_resolver(Arc::new(HttpResolver::new("http://localhost:1337")));
    
    let descriptor = ExtensionDescriptor::new("extension://rag/index.js").with_name("rag");
    manager.activate_extension(&descriptor).await.unwrap();
    
    assert!(manager.get(ExtensionType::Rag).is_some());
}

#[tokio::test]
async fn test_concurrent_activation_has_no_ordering_dependency() {
    let inner = StaticModuleLoader::new()
        .with_module("/ext/a", mock_class(Some(ExtensionType::Assistant)))
        .with_module("/ext/b", mock_class(Some(ExtensionType::Model)))
        .with_module("/ext/c", mock_class(Some(ExtensionType::Hardware)));
    let delays = HashMap::from([
        ("/ext/a".to_string(), Duration::from_millis(30)),
        ("/ext/b".to_string(), Duration::from_millis(0)),
        ("/ext/c".to_string(), Duration::from_millis(15)),
    ]);
    let host = MockHost::new().with_active(json!([
        record("/ext/a", "a"),
        record("/ext/b", "b"),
        record("/ext/c", "c"),
    ]));
    let manager = ExtensionManager::new(Arc::new(DelayedLoader { inner, delays }))
        .with_host(Arc::new(host));
    
    let report = manager.register_active().await;
    
    assert!(report.is_success());
    assert_eq!(report.activated.len(), 3);
    assert_eq!(manager.get_all().len(), 3);
    for ext_type in [ExtensionType::Assistant, ExtensionType::Model, ExtensionType::Hardware] {
        assert!(manager.get(ext_type).is_some(), "{} missing", ext_type);
    }
}

#[tokio::test]
async fn test_non_class_module_is_skipped() {
    let loader = StaticModuleLoader::new()
        .with_module("/ext/lib", ModuleExport::Value(json!({ "helper": true })))
        .with_module("/ext/mcp", mock_class(Some(ExtensionType::Mcp)));
    let host = MockHost::new().with_active(json!([record("/ext/lib", "lib"), record("/ext/mcp", "mcp")]));
    let manager = manager_with(host, loader);
    
    let report = manager.register_active().await;
    
    assert!(report.is_success());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name(), Some("lib"));
    assert!(manager.get_by_name("lib").is_none());
    assert!(manager.get(ExtensionType::Mcp).is_some());
    assert_eq!(manager.get_all().len(), 1);
}

#[tokio::test]
async fn test_failed_activation_is_isolated() {
    let loader = StaticModuleLoader::new()
        .with_module("/ext/broken", failing_class())
        .with_module("/ext/model", mock_class(Some(ExtensionType::Model)));
    let host = MockHost::new().with_active(json!([
        record("/ext/broken", "broken"),
        record("/ext/missing", "missing"),
        record("/ext/model", "model"),
    ]));
    let manager = manager_with(host, loader);
    
    let report = manager.register_active().await;
    
    assert_eq!(report.total(), 3);
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed.iter().all(|(_, e)| e.is_activation_error()));
    assert!(report.failed.iter().any(|(d, e)| d.name() == Some("missing")
        && matches!(e, ExtensionError::ModuleNotFound { .. })));
    assert!(manager.get(ExtensionType::Model).is_some());
}

#[tokio::test]
async fn test_install_cancelled_and_unavailable() {
    let cancelled = manager_with(MockHost::new(), StaticModuleLoader::new());
    assert!(matches!(cancelled.install(&["pkg".to_string()]).await, InstallOutcome::Cancelled));
    
    let failing = manager_with(
        MockHost::new().with_install(Err(ExtensionError::host_call_failed("denied"))),
        StaticModuleLoader::new(),
    );
    assert!(matches!(failing.install(&["pkg".to_string()]).await, InstallOutcome::Unavailable));
    
    let hostless = ExtensionManager::new(Arc::new(StaticModuleLoader::new()));
    assert!(matches!(hostless.install(&["pkg".to_string()]).await, InstallOutcome::Unavailable));
}

#[tokio::test]
async fn test_install_activates_installed_extensions() {
    let loader = StaticModuleLoader::new()
        .with_package("vector-db", mock_class(Some(ExtensionType::VectorDb)));
    let host = MockHost::new().with_install(Ok(InstallResponse::Installed(vec![
        record("/data/extensions/vector-db/index.js", "vector-db"),
    ])));
    let manager = manager_with(host, loader);
    
    let outcome = manager.install(&["/tmp/vector-db".to_string()]).await;
    
    let InstallOutcome::Installed(descriptors) = outcome else {
        panic!("expected installed outcome");
    };
    assert_eq!(descriptors.len(), 1);
    assert!(manager.get(ExtensionType::VectorDb).is_some());
}

#[tokio::test]
async fn test_uninstall_failure_leaves_registry_untouched() {
    let loader = StaticModuleLoader::new().with_module("/ext/hf", mock_class(Some(ExtensionType::HuggingFace)));
    let host = Arc::new(MockHost::new()
        .with_active(json!([record("/ext/hf", "hf")]))
        .with_uninstall(Ok(false)));
    let manager = ExtensionManager::new(Arc::new(loader)).with_host(host.clone());
    manager.register_active().await;
    
    let names = vec!["hf".to_string()];
    assert!(!manager.uninstall(&names, true).await);
    
    assert!(manager.get_by_name("hf").is_some());
    assert!(manager.get(ExtensionType::HuggingFace).is_some());
    assert_eq!(host.uninstall_calls(), vec![(names, true)]);
}

#[tokio::test]
async fn test_uninstall_host_error_reports_failure() {
    let manager = manager_with(
        MockHost::new().with_uninstall(Err(ExtensionError::host_call_failed("gone"))),
        StaticModuleLoader::new(),
    );
    assert!(!manager.uninstall(&["x".to_string()], false).await);
    
    let hostless = ExtensionManager::new(Arc::new(StaticModuleLoader::new()));
    assert!(!hostless.uninstall(&["x".to_string()], false).await);
}

#[tokio::test]
async fn test_activation_events_are_published() {
    let bus = AsyncNotificationManager::<ExtensionEvent>::new();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(Arc::new(CallbackSubscriber::new("log", move |event: ExtensionEvent| {
        sink.lock().unwrap().push(event.event_name());
    })))
    .await
    .unwrap();
    
    let loader = StaticModuleLoader::new()
        .with_module("/ext/a", mock_class(Some(ExtensionType::Engine)))
        .with_module("/ext/b", ModuleExport::Value(json!(null)));
    let manager = ExtensionManager::new(Arc::new(loader)).with_events(bus);
    
    manager.activate_extension(&ExtensionDescriptor::new("/ext/a")).await.unwrap();
    manager.activate_extension(&ExtensionDescriptor::new("/ext/b")).await.unwrap();
    assert!(manager.activate_extension(&ExtensionDescriptor::new("/ext/c")).await.is_err());
    
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["onExtensionRegistered", "onExtensionSkipped", "onActivationFailed"]
    );
}
