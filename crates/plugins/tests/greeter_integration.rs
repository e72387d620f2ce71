//! Runs the greeter plugin through a real registry

use std::fs;
use std::sync::Arc;

use kiln::services::{BuiltinLoader, Database, NoWorldGenerators, ServerInfo};
use kiln::{HostServices, PluginRegistry, PluginSystemSettings, PluginState};
use kiln_plugins::greeter::{Outbox, FAREWELL_RESOURCE};
use kiln_plugins::GreeterPlugin;
use tempfile::TempDir;

struct NullDatabase;

impl Database for NullDatabase {
    fn name(&self) -> &str {
        "null"
    }
}

fn registry(tmp: &TempDir) -> PluginRegistry {
    let settings = PluginSystemSettings {
        plugins_dir: tmp.path().join("plugins"),
        ..Default::default()
    };
    let services = HostServices::new(
        Arc::new(ServerInfo::new("Greeter Test Server", "0.1.0")),
        Arc::new(BuiltinLoader),
        Arc::new(NullDatabase),
        Arc::new(NoWorldGenerators),
    );
    PluginRegistry::new(settings, services)
}

fn start_greeter(registry: &mut PluginRegistry) -> Outbox {
    let outbox = Outbox::default();
    registry
        .register(
            GreeterPlugin::descriptor().unwrap(),
            GreeterPlugin::new(outbox.clone()),
            Arc::new(GreeterPlugin::bundle()),
        )
        .unwrap();
    let report = registry.start_batch().unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    outbox
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_enable_extracts_default_files() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registry(&tmp);
    start_greeter(&mut registry);

    let folder = tmp.path().join("plugins").join("Greeter");
    assert!(folder.join("config.yml").is_file());
    let farewell = fs::read_to_string(folder.join(FAREWELL_RESOURCE)).unwrap();
    assert!(farewell.starts_with("Goodbye"));
    assert!(registry.is_enabled("Greeter"));
}

#[test]
fn test_greet_uses_argument_or_sender() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registry(&tmp);
    let outbox = start_greeter(&mut registry);

    assert!(registry.dispatch_command("Steve", "greet", &args(&["Alex"])).unwrap());
    assert!(registry.dispatch_command("Steve", "HI", &[]).unwrap());

    let sent = outbox.lock().clone();
    assert_eq!(sent, vec!["[Greeter] Hello, Alex!", "[Greeter] Hello, Steve!"]);
}

#[test]
fn test_set_greeting_persists_to_config_file() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registry(&tmp);
    let outbox = start_greeter(&mut registry);

    assert!(!registry.dispatch_command("Steve", "setgreeting", &[]).unwrap());
    assert!(registry
        .dispatch_command("Steve", "setgreeting", &args(&["Good", "morning"]))
        .unwrap());
    assert!(registry.dispatch_command("Steve", "greet", &[]).unwrap());
    assert_eq!(
        outbox.lock().last().map(String::as_str),
        Some("[Greeter] Good morning, Steve!")
    );

    let handle = registry.get("Greeter").unwrap();
    handle.reload_config().unwrap();
    assert_eq!(
        handle.get_config().get_string_list("greetings"),
        Some(vec!["Good morning".to_string()])
    );
}

#[test]
fn test_disable_saves_greeting_count_and_says_goodbye() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registry(&tmp);
    let outbox = start_greeter(&mut registry);

    for _ in 0..3 {
        registry.dispatch_command("Steve", "greet", &[]).unwrap();
    }
    registry.disable_plugin("Greeter").unwrap();

    let handle = registry.get("Greeter").unwrap();
    assert_eq!(handle.state(), PluginState::Disabled);
    handle.reload_config().unwrap();
    assert_eq!(handle.get_config().get_i64("times_greeted"), Some(3));
    assert_eq!(
        outbox.lock().last().map(String::as_str),
        Some("[Greeter] Goodbye, and thanks for stopping by.")
    );

    // Commands are refused while disabled.
    assert!(registry.dispatch_command("Steve", "greet", &[]).is_err());
}

#[test]
fn test_count_survives_restart() {
    let tmp = TempDir::new().unwrap();
    {
        let mut registry = registry(&tmp);
        start_greeter(&mut registry);
        registry.dispatch_command("Steve", "greet", &[]).unwrap();
        registry.shutdown();
    }

    let mut registry = registry(&tmp);
    start_greeter(&mut registry);
    registry.dispatch_command("Steve", "greet", &[]).unwrap();
    registry.disable_plugin("Greeter").unwrap();

    let handle = registry.get("Greeter").unwrap();
    handle.reload_config().unwrap();
    assert_eq!(handle.get_config().get_i64("times_greeted"), Some(2));
}

#[test]
fn test_empty_greetings_nag_once_and_fall_back() {
    let tmp = TempDir::new().unwrap();
    let folder = tmp.path().join("plugins").join("Greeter");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("config.yml"), "greetings: []\nprefix: '>>'\n").unwrap();

    let mut registry = registry(&tmp);
    let outbox = start_greeter(&mut registry);

    let handle = registry.get("Greeter").unwrap();
    assert!(!handle.is_naggable());
    // The user's file is left alone by the default extraction.
    assert_eq!(
        fs::read_to_string(folder.join("config.yml")).unwrap(),
        "greetings: []\nprefix: '>>'\n"
    );

    registry.dispatch_command("Alex", "greet", &[]).unwrap();
    assert_eq!(outbox.lock().last().map(String::as_str), Some(">> Hello, Alex!"));
}

#[test]
fn test_missing_farewell_does_not_block_disable() {
    let tmp = TempDir::new().unwrap();
    let mut registry = registry(&tmp);
    let outbox = start_greeter(&mut registry);

    let folder = tmp.path().join("plugins").join("Greeter");
    fs::remove_file(folder.join(FAREWELL_RESOURCE)).unwrap();
    registry.disable_plugin("Greeter").unwrap();

    assert!(outbox.lock().is_empty());
    let handle = registry.get("Greeter").unwrap();
    handle.reload_config().unwrap();
    assert_eq!(handle.get_config().get_i64("times_greeted"), Some(0));
}
