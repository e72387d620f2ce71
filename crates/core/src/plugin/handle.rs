//! The per-plugin aggregate shared by the host and the plugin's own code

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use super::{LifecycleState, PluginDescriptor, PluginState};
use crate::config::{ConfigDocument, ConfigStore};
use crate::data_dir::DataDirectory;
use crate::error::Result;
use crate::resource::ResourceBundle;
use crate::services::{ChunkGenerator, Database, HostServices, PluginLoader, Server};

/// Everything a plugin can reach: its descriptor, data directory, bundled
/// resources, configuration, lifecycle flags and the host services.
///
/// The service references stay valid for as long as the handle exists.
/// Discarding a plugin drops its handle, so no reference outlives the
/// plugin's retirement.
pub struct PluginHandle {
    descriptor: Arc<PluginDescriptor>,
    data_dir: DataDirectory,
    resources: Arc<dyn ResourceBundle>,
    config: Arc<ConfigStore>,
    lifecycle: LifecycleState,
    services: HostServices,
}

impl PluginHandle {
    /// Binds a plugin to its data directory and host services.
    pub fn new(
        descriptor: Arc<PluginDescriptor>,
        data_dir: DataDirectory,
        resources: Arc<dyn ResourceBundle>,
        services: HostServices,
        config_file_name: &str,
    ) -> Result<Self> {
        let config = ConfigStore::new(
            descriptor.name.clone(),
            data_dir.clone(),
            Arc::clone(&resources),
            config_file_name,
        )?;

        Ok(Self {
            lifecycle: LifecycleState::new(descriptor.name.clone()),
            descriptor,
            data_dir,
            resources,
            config: Arc::new(config),
            services,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    /// The plugin's data directory. It may not exist yet.
    pub fn data_folder(&self) -> &Path {
        self.data_dir.root()
    }

    pub fn data_dir(&self) -> &DataDirectory {
        &self.data_dir
    }

    pub fn resources(&self) -> &Arc<dyn ResourceBundle> {
        &self.resources
    }

    /// Opens an embedded resource. `None` when it does not exist.
    pub fn get_resource(&self, path: &str) -> Option<Box<dyn Read + Send + '_>> {
        self.resources.get_resource(path)
    }

    /// The config store, cloneable for use from the plugin's own threads.
    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn get_config(&self) -> ConfigDocument {
        self.config.get_config()
    }

    pub fn reload_config(&self) -> Result<()> {
        self.config.reload_config()
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save_config()
    }

    pub fn save_default_config(&self) -> Result<bool> {
        self.config.save_default_config()
    }

    pub fn save_resource(&self, resource_path: &str, replace: bool) -> Result<()> {
        self.config.save_resource(resource_path, replace)
    }

    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    pub fn state(&self) -> PluginState {
        self.lifecycle.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.is_enabled()
    }

    pub fn is_naggable(&self) -> bool {
        self.lifecycle.is_naggable()
    }

    pub fn set_naggable(&self, naggable: bool) {
        self.lifecycle.set_naggable(naggable);
    }

    /// Logs a warning about this plugin once.
    ///
    /// After the first warning the plugin is no longer naggable and further
    /// calls are silent until it opts back in. Returns whether the message
    /// was logged.
    pub fn nag(&self, message: impl std::fmt::Display) -> bool {
        if !self.lifecycle.take_naggable() {
            return false;
        }
        tracing::warn!(plugin = %self.descriptor.name, "{}", message);
        true
    }

    pub fn server(&self) -> &Arc<dyn Server> {
        self.services.server()
    }

    pub fn plugin_loader(&self) -> &Arc<dyn PluginLoader> {
        self.services.loader()
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        self.services.database()
    }

    /// Generator for a default world, as selected by the server configuration.
    pub fn default_world_generator(
        &self,
        world_name: &str,
        id: Option<&str>,
    ) -> Option<Arc<dyn ChunkGenerator>> {
        self.services
            .generators()
            .default_world_generator(world_name, id)
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("name", &self.descriptor.name)
            .field("version", &self.descriptor.version)
            .field("state", &self.state())
            .field("data_dir", &self.data_dir.root())
            .finish_non_exhaustive()
    }
}
