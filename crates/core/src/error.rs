//! Error types shared by the plugin contract

use std::path::PathBuf;

use crate::plugin::PluginState;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PluginError> = std::result::Result<T, E>;

/// Lifecycle phase a module callback failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Load,
    Enable,
    Disable,
    Command,
}

impl std::fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Enable => write!(f, "enable"),
            Self::Disable => write!(f, "disable"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Errors raised by the plugin host and the per-plugin stores.
///
/// None of these are fatal to the host process. Every failure is scoped to
/// the plugin that caused it.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// On-disk configuration could not be parsed.
    #[error("Failed to parse configuration {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// Filesystem failure while creating, reading or writing.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Plugin '{plugin}' cannot transition from {from} to {to}")]
    InvalidTransition {
        plugin: String,
        from: PluginState,
        to: PluginState,
    },

    /// An enable was requested while some registered plugins have not been loaded.
    #[error("Load phase incomplete, plugins still awaiting on_load: {}", pending.join(", "))]
    LoadPhaseIncomplete { pending: Vec<String> },

    #[error("Plugin '{0}' already registered")]
    DuplicatePlugin(String),

    #[error("Data directory {} is already assigned to another plugin", .0.display())]
    DataDirectoryInUse(PathBuf),

    #[error("Plugin '{0}' not found")]
    PluginNotFound(String),

    #[error("No plugin handles command '{0}'")]
    UnknownCommand(String),

    #[error("Plugin '{0}' is not enabled")]
    NotEnabled(String),

    #[error("Invalid plugin descriptor: {0}")]
    InvalidDescriptor(String),

    /// A plugin's own callback returned an error.
    #[error("Plugin '{plugin}' failed during {phase}: {source}")]
    Callback {
        plugin: String,
        phase: CallbackPhase,
        #[source]
        source: anyhow::Error,
    },
}

impl PluginError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::ConfigParse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
