//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use kiln::services::{BuiltinLoader, Database, NoWorldGenerators, ServerInfo};
use kiln::{HostServices, PluginRegistry, PluginSystemSettings};
use parking_lot::Mutex;
use tempfile::TempDir;

pub struct MemoryDatabase;

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        "memory"
    }
}

pub fn services() -> HostServices {
    HostServices::new(
        Arc::new(ServerInfo::new("Kiln Test Server", "0.1.0")),
        Arc::new(BuiltinLoader),
        Arc::new(MemoryDatabase),
        Arc::new(NoWorldGenerators),
    )
}

pub fn registry(tmp: &TempDir, parallel: bool) -> PluginRegistry {
    let settings = PluginSystemSettings {
        plugins_dir: tmp.path().join("plugins"),
        parallel_lifecycle: parallel,
        ..Default::default()
    };
    PluginRegistry::new(settings, services())
}

/// Ordered record of lifecycle callbacks across plugins.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<(String, &'static str)>>>);

impl EventLog {
    pub fn push(&self, plugin: &str, event: &'static str) {
        self.0.lock().push((plugin.to_owned(), event));
    }

    pub fn events(&self) -> Vec<(String, &'static str)> {
        self.0.lock().clone()
    }
}
