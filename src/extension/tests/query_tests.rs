//! Capability query surface tests

use std::sync::Arc;

use crate::extension::*;
use crate::extension::tests::mock_extensions::*;

fn names(extensions: &[ExtensionRef]) -> Vec<String> {
    extensions.iter().map(|e| e.name().to_string()).collect()
}

#[test]
fn test_registration_overwrite() {
    let registry = SharedExtensionRegistry::new();
    let first: ExtensionRef = Arc::new(MockExtension::new("first").with_type(ExtensionType::Conversational));
    let second: ExtensionRef = Arc::new(MockExtension::new("second").with_type(ExtensionType::Conversational));
    registry.register("first-ext", first.clone());
    registry.register("second-ext", second.clone());
    
    assert!(Arc::ptr_eq(&registry.get(ExtensionType::Conversational).unwrap(), &second));
    assert!(Arc::ptr_eq(&registry.get_by_name("first-ext").unwrap(), &first));
    assert_eq!(registry.get_all().len(), 1);
}

#[test]
fn test_lookup_paths_are_independent() {
    let registry = SharedExtensionRegistry::new();
    let model: ExtensionRef = Arc::new(MockExtension::new("model-impl").with_type(ExtensionType::Model));
    let alias: ExtensionRef = Arc::new(MockExtension::new("alias-impl"));
    registry.register("model-ext", model.clone());
    registry.register("model-alias", alias.clone());
    
    let by_type = registry.get(ExtensionType::Model).unwrap();
    let by_name = registry.get_by_name("model-ext").unwrap();
    assert!(Arc::ptr_eq(&by_type, &model));
    assert!(Arc::ptr_eq(&by_name, &model));
    assert!(Arc::ptr_eq(&registry.get_by_name("model-alias").unwrap(), &alias));
    assert!(!Arc::ptr_eq(&by_type, &registry.get_by_name("model-alias").unwrap()));
    assert_eq!(registry.get_all().len(), 2);
}

#[test]
fn test_untyped_name_shares_key_with_type() {
    let registry = SharedExtensionRegistry::new();
    let model: ExtensionRef = Arc::new(MockExtension::new("model-impl").with_type(ExtensionType::Model));
    let named_model: ExtensionRef = Arc::new(MockExtension::new("named-model"));
    registry.register("model-ext", model.clone());
    registry.register("model", named_model.clone());
    
    // An untyped instance named after a type takes that type's slot.
    assert!(Arc::ptr_eq(&registry.get(ExtensionType::Model).unwrap(), &named_model));
    assert!(Arc::ptr_eq(&registry.get_by_name("model").unwrap(), &named_model));
    assert!(Arc::ptr_eq(&registry.get_by_name("model-ext").unwrap(), &model));
    assert_eq!(registry.get_all().len(), 1);
}

#[test]
fn test_listing_is_idempotent() {
    let registry = SharedExtensionRegistry::new();
    registry.register("a", Arc::new(MockExtension::new("a").with_type(ExtensionType::Hardware)));
    registry.register("b", Arc::new(MockExtension::new("b")));
    
    let once = registry.get_all();
    let twice = registry.list_extensions();
    assert_eq!(once.len(), twice.len());
    assert!(once.iter().zip(&twice).all(|(x, y)| Arc::ptr_eq(x, y)));
    assert_eq!(names(&once), vec!["a", "b"]);
}

#[test]
fn test_engine_lookup_shares_typed_storage() {
    let registry = SharedExtensionRegistry::new();
    registry.register("llamacpp", Arc::new(MockEngine::new("llamacpp", "llamacpp")));
    registry.register("remote", Arc::new(MockEngine::new("remote", "openai").with_type(ExtensionType::Engine)));
    registry.register("openai", Arc::new(MockExtension::new("not-an-engine")));
    
    // Untyped engine registered under its provider name: reachable by provider.
    assert_eq!(registry.get_engine("llamacpp").unwrap().name(), "llamacpp");
    // Typed engine lives under its type, so provider lookup only hits a non-engine.
    assert!(registry.get_engine("openai").is_none());
    assert_eq!(registry.find_engine("openai").unwrap().name(), "remote");
    assert_eq!(registry.inner().read().engines().len(), 2);
}

#[tokio::test]
async fn test_manager_is_a_query_surface() {
    let manager = ExtensionManager::new(Arc::new(StaticModuleLoader::new()));
    manager.register("hw", Arc::new(MockExtension::new("hw").with_type(ExtensionType::Hardware)));
    
    let query: Arc<dyn CapabilityQuery> = Arc::new(manager);
    assert!(query.get(ExtensionType::Hardware).is_some());
    assert!(query.get_by_name("hw").is_some());
    assert_eq!(query.list_extensions().len(), 1);
    assert!(query.get_engine("hw").is_none());
}
