//! Kiln plugin contract
//!
//! Defines what a loaded plugin can rely on from the host: a load, enable,
//! disable lifecycle, a private data directory, layered configuration with
//! an embedded default, access to bundled resources, and references to the
//! host's services.

pub mod config;
pub mod data_dir;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod resource;
pub mod services;
pub mod settings;

pub use config::{ConfigDocument, ConfigFormat, ConfigStore};
pub use data_dir::DataDirectory;
pub use error::{CallbackPhase, PluginError, Result};
pub use plugin::{
    BatchReport, CommandDescriptor, CommandExecutor, CommandInvocation, LifecycleState, Plugin,
    PluginDescriptor, PluginHandle, PluginRegistry, PluginState,
};
pub use resource::{DirectoryResources, EmbeddedResources, ResourceBundle};
pub use services::HostServices;
pub use settings::{LogFormat, LogSettings, PluginSystemSettings};

/// Plugin system version for Kiln
pub const KILN_PLUGIN_SYSTEM_VERSION: &str = "1.0.0";

/// Initialize the Kiln plugin system
pub fn init_plugin_system(
    settings: PluginSystemSettings,
    services: HostServices,
) -> anyhow::Result<PluginRegistry> {
    tracing::info!("Initializing Kiln plugin system v{}", KILN_PLUGIN_SYSTEM_VERSION);

    settings.validate()?;
    tracing::debug!(
        "Plugin data directories under {}, config file {}",
        settings.plugins_dir.display(),
        settings.config_file_name
    );
    let registry = PluginRegistry::new(settings, services);

    tracing::info!("Kiln plugin system initialized");
    Ok(registry)
}
