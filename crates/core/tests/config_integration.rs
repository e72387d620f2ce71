//! Configuration and resource behavior seen through a registered plugin

mod common;

use std::sync::Arc;

use kiln::{
    ConfigDocument, DirectoryResources, EmbeddedResources, Plugin, PluginDescriptor, PluginError,
    PluginHandle, PluginRegistry, ResourceBundle,
};
use serde_json::json;
use tempfile::TempDir;

struct Inert;

impl Plugin for Inert {}

fn registered(tmp: &TempDir, resources: Arc<dyn ResourceBundle>) -> PluginRegistry {
    let mut registry = common::registry(tmp, false);
    registry
        .register(PluginDescriptor::new("Example", "1.0"), Inert, resources)
        .unwrap();
    registry
}

fn handle(registry: &PluginRegistry) -> &PluginHandle {
    registry.get("Example").unwrap()
}

fn defaults() -> Arc<dyn ResourceBundle> {
    Arc::new(
        EmbeddedResources::new()
            .with_entry("config.yml", "a: 1\nb: 2\n")
            .with_entry("x/y.txt", "from bundle"),
    )
}

#[test]
fn test_data_folder_is_created_lazily() {
    let tmp = TempDir::new().unwrap();
    let registry = registered(&tmp, defaults());
    let handle = handle(&registry);

    assert_eq!(handle.data_folder(), tmp.path().join("plugins").join("Example"));
    handle.get_config();
    assert!(!handle.data_folder().exists());

    handle.save_config().unwrap();
    assert!(handle.data_folder().join("config.yml").is_file());
}

#[test]
fn test_default_layering() {
    let tmp = TempDir::new().unwrap();
    let registry = registered(&tmp, defaults());
    let handle = handle(&registry);

    std::fs::create_dir_all(handle.data_folder()).unwrap();
    std::fs::write(handle.data_folder().join("config.yml"), "b: 3\n").unwrap();
    handle.reload_config().unwrap();

    let doc = handle.get_config();
    assert_eq!(doc.get("a"), Some(&json!(1)));
    assert_eq!(doc.get("b"), Some(&json!(3)));
}

#[test]
fn test_save_reload_round_trip_is_stable() {
    let tmp = TempDir::new().unwrap();
    let registry = registered(&tmp, defaults());
    let handle = handle(&registry);

    handle.config_store().update_config(|doc| {
        doc.set("b", 5);
        doc.set("section.flag", true);
        doc.set("names", json!(["x", "y"]));
    });
    let saved = handle.get_config();
    handle.save_config().unwrap();
    let first = std::fs::read_to_string(handle.data_folder().join("config.yml")).unwrap();

    handle.reload_config().unwrap();
    assert_eq!(handle.get_config(), saved);

    handle.save_config().unwrap();
    let second = std::fs::read_to_string(handle.data_folder().join("config.yml")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_malformed_reload_keeps_document() {
    let tmp = TempDir::new().unwrap();
    let registry = registered(&tmp, defaults());
    let handle = handle(&registry);
    let before = handle.get_config();

    std::fs::create_dir_all(handle.data_folder()).unwrap();
    std::fs::write(handle.data_folder().join("config.yml"), "a: [\n").unwrap();

    assert!(matches!(
        handle.reload_config(),
        Err(PluginError::ConfigParse { .. })
    ));
    assert_eq!(handle.get_config(), before);
}

#[test]
fn test_save_default_config_twice() {
    let tmp = TempDir::new().unwrap();
    let registry = registered(&tmp, defaults());
    let handle = handle(&registry);
    let path = handle.data_folder().join("config.yml");

    assert!(handle.save_default_config().unwrap());
    let first = std::fs::read(&path).unwrap();
    assert_eq!(first, b"a: 1\nb: 2\n");

    assert!(!handle.save_default_config().unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn test_save_resource_from_directory_bundle() {
    let tmp = TempDir::new().unwrap();
    let packaged = tmp.path().join("packaged");
    std::fs::create_dir_all(packaged.join("x")).unwrap();
    std::fs::write(packaged.join("x/y.txt"), "v1").unwrap();

    let registry = registered(&tmp, Arc::new(DirectoryResources::new(&packaged)));
    let handle = handle(&registry);
    let target = handle.data_folder().join("x/y.txt");

    handle.save_resource("x/y.txt", false).unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "v1");

    std::fs::write(packaged.join("x/y.txt"), "v2").unwrap();
    handle.save_resource("x/y.txt", false).unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "v1");

    handle.save_resource("x/y.txt", true).unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "v2");

    assert!(matches!(
        handle.save_resource("", true),
        Err(PluginError::InvalidArgument(_))
    ));
    assert!(matches!(
        handle.save_resource("does/not/exist", true),
        Err(PluginError::InvalidArgument(_))
    ));
}

#[test]
fn test_config_survives_disable_enable_cycle() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registered(&tmp, defaults());
    registry.start_batch().unwrap();

    handle(&registry)
        .config_store()
        .update_config(|doc| doc.set("kept", "yes"));
    registry.disable_plugin("Example").unwrap();
    registry.enable_plugin("Example").unwrap();

    let doc: ConfigDocument = handle(&registry).get_config();
    assert_eq!(doc.get_str("kept"), Some("yes"));
}
