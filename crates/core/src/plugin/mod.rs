//! Plugin system for Kiln
//!
//! Plugins are composed from independent capabilities: the lifecycle
//! callbacks in [`Plugin`] and the optional [`CommandExecutor`]. The host
//! binds each plugin to a [`PluginHandle`] and drives it through a
//! [`PluginRegistry`].

#[allow(clippy::module_inception)]
pub mod plugin;
pub mod descriptor;
pub mod lifecycle;
pub mod handle;
pub mod registry;

// Re-export core types
pub use plugin::{CommandExecutor, CommandInvocation, Plugin, PluginState};
pub use descriptor::{CommandDescriptor, PluginDescriptor, DESCRIPTOR_FILE};
pub use lifecycle::LifecycleState;
pub use handle::PluginHandle;
pub use registry::{BatchReport, ManagedPlugin, PluginRegistry, PluginRegistryStats};
