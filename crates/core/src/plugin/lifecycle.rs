//! Enabled/naggable flags and the lifecycle state machine of one plugin

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::PluginState;
use crate::error::{PluginError, Result};

/// Lifecycle bookkeeping for a single plugin.
///
/// Transitions are driven by the host only. `naggable` is independent of
/// the state machine and may be flipped by the plugin at any time.
#[derive(Debug)]
pub struct LifecycleState {
    plugin: String,
    inner: RwLock<Inner>,
    naggable: AtomicBool,
}

#[derive(Debug)]
struct Inner {
    state: PluginState,
    enable_count: u64,
    last_transition: Instant,
}

impl LifecycleState {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            inner: RwLock::new(Inner {
                state: PluginState::Constructed,
                enable_count: 0,
                last_transition: Instant::now(),
            }),
            naggable: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> PluginState {
        self.inner.read().state
    }

    /// True exactly while the last applied transition was into `Enabled`.
    pub fn is_enabled(&self) -> bool {
        self.state().is_enabled()
    }

    /// Number of times the plugin has been enabled.
    pub fn enable_count(&self) -> u64 {
        self.inner.read().enable_count
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self) -> Duration {
        self.inner.read().last_transition.elapsed()
    }

    pub fn is_naggable(&self) -> bool {
        self.naggable.load(Ordering::Acquire)
    }

    pub fn set_naggable(&self, naggable: bool) {
        self.naggable.store(naggable, Ordering::Release);
    }

    /// Clears the flag, returning whether it was set.
    pub(crate) fn take_naggable(&self) -> bool {
        self.naggable.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn ensure_can_transition(&self, to: PluginState) -> Result<()> {
        let from = self.state();
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(self.invalid(from, to))
        }
    }

    /// Set plugin state with validation
    pub(crate) fn transition(&self, to: PluginState) -> Result<()> {
        let mut inner = self.inner.write();
        let from = inner.state;
        if !from.can_transition_to(to) {
            return Err(self.invalid(from, to));
        }

        tracing::debug!("Plugin {} state: {} -> {}", self.plugin, from, to);
        inner.state = to;
        inner.last_transition = Instant::now();
        if to == PluginState::Enabled {
            inner.enable_count += 1;
        }
        Ok(())
    }

    fn invalid(&self, from: PluginState, to: PluginState) -> PluginError {
        PluginError::InvalidTransition {
            plugin: self.plugin.clone(),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_enabled_tracks_last_transition() {
        let lifecycle = LifecycleState::new("Example");
        assert!(!lifecycle.is_enabled());

        lifecycle.transition(PluginState::Loaded).unwrap();
        assert!(!lifecycle.is_enabled());

        lifecycle.transition(PluginState::Enabled).unwrap();
        assert!(lifecycle.is_enabled());

        lifecycle.transition(PluginState::Disabled).unwrap();
        assert!(!lifecycle.is_enabled());

        lifecycle.transition(PluginState::Enabled).unwrap();
        assert_eq!(lifecycle.enable_count(), 2);
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let lifecycle = LifecycleState::new("Example");
        let err = lifecycle.transition(PluginState::Enabled).unwrap_err();
        assert!(matches!(
            err,
            PluginError::InvalidTransition {
                from: PluginState::Constructed,
                to: PluginState::Enabled,
                ..
            }
        ));
        assert_eq!(lifecycle.state(), PluginState::Constructed);
    }

    #[test]
    fn test_transition_resets_time_in_state() {
        let lifecycle = LifecycleState::new("Example");
        std::thread::sleep(Duration::from_millis(50));
        assert!(lifecycle.time_in_state() >= Duration::from_millis(50));

        lifecycle.transition(PluginState::Loaded).unwrap();
        assert!(lifecycle.time_in_state() < Duration::from_millis(50));
    }

    #[test]
    fn test_naggable_is_independent() {
        let lifecycle = LifecycleState::new("Example");
        assert!(lifecycle.is_naggable());

        lifecycle.set_naggable(false);
        assert!(!lifecycle.is_naggable());
        lifecycle.transition(PluginState::Loaded).unwrap();
        assert!(!lifecycle.is_naggable());

        lifecycle.set_naggable(true);
        assert!(lifecycle.take_naggable());
        assert!(!lifecycle.take_naggable());
    }
}
