//! Kiln Plugins
//!
//! First-party plugins built against the Kiln plugin contract.

pub mod greeter;

// Re-export core plugin types for convenience
pub use kiln::plugin::{CommandExecutor, CommandInvocation, Plugin, PluginDescriptor, PluginHandle};

// Re-export plugin implementations
pub use greeter::GreeterPlugin;
