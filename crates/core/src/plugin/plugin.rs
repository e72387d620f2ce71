//! Capability traits a plugin implements and the lifecycle state enum

use serde::{Deserialize, Serialize};

use super::PluginHandle;

/// Lifecycle callbacks every plugin implements.
///
/// The host calls these one at a time for a given plugin. Every `on_load`
/// of a batch completes before any `on_enable` of that batch starts.
pub trait Plugin: Send {
    /// Called after construction, before any plugin of the batch is enabled.
    ///
    /// Other plugins may not have been loaded yet.
    fn on_load(&mut self, _handle: &PluginHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the plugin goes live.
    fn on_enable(&mut self, _handle: &PluginHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the plugin is taken down. Release resources here.
    fn on_disable(&mut self, _handle: &PluginHandle) -> anyhow::Result<()> {
        Ok(())
    }

    /// The command capability, for plugins that handle commands.
    fn command_executor(&mut self) -> Option<&mut dyn CommandExecutor> {
        None
    }
}

/// Optional capability: handling commands routed to the plugin.
pub trait CommandExecutor: Send {
    /// Returns `Ok(false)` when the invocation was not valid usage.
    fn on_command(
        &mut self,
        handle: &PluginHandle,
        invocation: &CommandInvocation,
    ) -> anyhow::Result<bool>;
}

/// A command routed to a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Name of whoever issued the command.
    pub sender: String,
    /// The command name as declared in the descriptor.
    pub command: String,
    /// The label actually typed, which may be an alias.
    pub label: String,
    pub args: Vec<String>,
}

/// Plugin state in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginState {
    /// Constructed by the host, `on_load` not yet invoked
    Constructed,
    /// `on_load` completed
    Loaded,
    /// Live
    Enabled,
    /// Taken down, may be enabled again or discarded
    Disabled,
    /// A callback failed; only discarding is possible
    Failed,
    /// Retired, terminal
    Discarded,
}

impl PluginState {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether `on_load` has run for this plugin.
    pub fn has_loaded(self) -> bool {
        !matches!(self, Self::Constructed)
    }

    /// Get the next valid states from the current state
    pub fn valid_transitions(self) -> &'static [PluginState] {
        match self {
            Self::Constructed => &[Self::Loaded, Self::Failed, Self::Discarded],
            Self::Loaded => &[Self::Enabled, Self::Failed, Self::Discarded],
            Self::Enabled => &[Self::Disabled, Self::Failed],
            Self::Disabled => &[Self::Enabled, Self::Failed, Self::Discarded],
            Self::Failed => &[Self::Discarded],
            Self::Discarded => &[],
        }
    }

    /// Check if transition to another state is valid
    pub fn can_transition_to(self, target: PluginState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructed => write!(f, "Constructed"),
            Self::Loaded => write!(f, "Loaded"),
            Self::Enabled => write!(f, "Enabled"),
            Self::Disabled => write!(f, "Disabled"),
            Self::Failed => write!(f, "Failed"),
            Self::Discarded => write!(f, "Discarded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PluginState::*;

    #[test]
    fn test_forward_path() {
        assert!(Constructed.can_transition_to(Loaded));
        assert!(Loaded.can_transition_to(Enabled));
        assert!(Enabled.can_transition_to(Disabled));
        assert!(Disabled.can_transition_to(Discarded));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Constructed.can_transition_to(Enabled));
        assert!(!Enabled.can_transition_to(Discarded));
        assert!(!Enabled.can_transition_to(Loaded));
        assert!(!Failed.can_transition_to(Enabled));
        assert!(Discarded.valid_transitions().is_empty());
    }

    #[test]
    fn test_re_enable_after_disable() {
        assert!(Disabled.can_transition_to(Enabled));
    }

    #[test]
    fn test_never_enabled_plugins_can_be_discarded() {
        assert!(Constructed.can_transition_to(Discarded));
        assert!(Loaded.can_transition_to(Discarded));
        assert!(Failed.can_transition_to(Discarded));
    }

    #[test]
    fn test_state_predicates() {
        assert!(Failed.is_failed());
        assert!(!Disabled.is_failed());
        assert!(Enabled.is_enabled());
        assert!(!Loaded.is_enabled());
        assert!(!Constructed.has_loaded());
        assert!(Failed.has_loaded());
    }
}
