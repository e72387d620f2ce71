//! Plugin registry driving the lifecycle of every registered plugin

use std::sync::Arc;

use rayon::prelude::*;

use super::{CommandInvocation, Plugin, PluginDescriptor, PluginHandle, PluginState};
use crate::data_dir::DataDirectory;
use crate::error::{CallbackPhase, PluginError, Result};
use crate::resource::ResourceBundle;
use crate::services::HostServices;
use crate::settings::PluginSystemSettings;

/// A plugin instance paired with its handle
pub struct ManagedPlugin {
    handle: PluginHandle,
    plugin: Box<dyn Plugin>,
}

impl ManagedPlugin {
    pub fn handle(&self) -> &PluginHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn state(&self) -> PluginState {
        self.handle.state()
    }

    /// Load the plugin
    fn load(&mut self) -> Result<()> {
        let lifecycle = self.handle.lifecycle();
        lifecycle.ensure_can_transition(PluginState::Loaded)?;

        match self.plugin.on_load(&self.handle) {
            Ok(()) => {
                lifecycle.transition(PluginState::Loaded)?;
                tracing::info!("Loaded plugin: {}", self.handle.descriptor().full_name());
                Ok(())
            }
            Err(e) => {
                lifecycle.transition(PluginState::Failed)?;
                Err(self.callback_error(CallbackPhase::Load, e))
            }
        }
    }

    /// Enable the plugin
    fn enable(&mut self) -> Result<()> {
        let lifecycle = self.handle.lifecycle();
        lifecycle.ensure_can_transition(PluginState::Enabled)?;

        match self.plugin.on_enable(&self.handle) {
            Ok(()) => {
                lifecycle.transition(PluginState::Enabled)?;
                tracing::info!("Enabled plugin: {}", self.handle.descriptor().full_name());
                Ok(())
            }
            Err(e) => {
                lifecycle.transition(PluginState::Failed)?;
                Err(self.callback_error(CallbackPhase::Enable, e))
            }
        }
    }

    /// Disable the plugin
    ///
    /// The plugin ends up disabled even when its callback fails.
    fn disable(&mut self) -> Result<()> {
        let lifecycle = self.handle.lifecycle();
        lifecycle.ensure_can_transition(PluginState::Disabled)?;

        let outcome = self.plugin.on_disable(&self.handle);
        lifecycle.transition(PluginState::Disabled)?;
        tracing::info!("Disabled plugin: {}", self.handle.descriptor().full_name());
        outcome.map_err(|e| self.callback_error(CallbackPhase::Disable, e))
    }

    fn dispatch(&mut self, invocation: &CommandInvocation) -> Result<bool> {
        if !self.handle.is_enabled() {
            return Err(PluginError::NotEnabled(self.name().to_owned()));
        }
        let Some(executor) = self.plugin.command_executor() else {
            tracing::debug!(
                "Plugin {} declares command {} but has no executor",
                self.handle.name(),
                invocation.command
            );
            return Ok(false);
        };
        executor
            .on_command(&self.handle, invocation)
            .map_err(|e| self.callback_error(CallbackPhase::Command, e))
    }

    fn callback_error(&self, phase: CallbackPhase, source: anyhow::Error) -> PluginError {
        tracing::error!("Plugin {} failed during {}: {:#}", self.handle.name(), phase, source);
        PluginError::Callback {
            plugin: self.handle.name().to_owned(),
            phase,
            source,
        }
    }
}

/// Outcome of driving one lifecycle phase over several plugins
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Plugins that completed the phase
    pub succeeded: Vec<String>,
    /// Plugins whose phase failed, with the reason
    pub failures: Vec<(String, PluginError)>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<(String, Result<()>)>) -> Self {
        let mut report = Self::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => report.succeeded.push(name),
                Err(e) => report.failures.push((name, e)),
            }
        }
        report
    }

    fn merge(&mut self, other: BatchReport) {
        self.succeeded.extend(other.succeeded);
        self.failures.extend(other.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plugin registry that manages all registered plugins
///
/// Plugins are kept in registration order. Loading and enabling happen in
/// two phases: every `on_load` of a batch completes before the first
/// `on_enable` starts.
pub struct PluginRegistry {
    settings: PluginSystemSettings,
    services: HostServices,
    plugins: Vec<ManagedPlugin>,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new(settings: PluginSystemSettings, services: HostServices) -> Self {
        Self {
            settings,
            services,
            plugins: Vec::new(),
        }
    }

    pub fn settings(&self) -> &PluginSystemSettings {
        &self.settings
    }

    /// Registers a plugin with the conventional data directory
    /// `<plugins_dir>/<name>`.
    pub fn register<P: Plugin + 'static>(
        &mut self,
        descriptor: PluginDescriptor,
        plugin: P,
        resources: Arc<dyn ResourceBundle>,
    ) -> Result<&PluginHandle> {
        descriptor.validate()?;
        let data_dir = DataDirectory::for_plugin(&self.settings.plugins_dir, &descriptor.name)?;
        self.register_in(descriptor, plugin, resources, data_dir)
    }

    /// Registers a plugin with a host-assigned data directory.
    ///
    /// The directory may neither equal nor nest with another plugin's.
    pub fn register_in<P: Plugin + 'static>(
        &mut self,
        descriptor: PluginDescriptor,
        plugin: P,
        resources: Arc<dyn ResourceBundle>,
        data_dir: DataDirectory,
    ) -> Result<&PluginHandle> {
        descriptor.validate()?;
        if self.find(&descriptor.name).is_some() {
            return Err(PluginError::DuplicatePlugin(descriptor.name));
        }
        if self.plugins.iter().any(|p| p.handle.data_dir().overlaps(&data_dir)) {
            return Err(PluginError::DataDirectoryInUse(data_dir.root().to_path_buf()));
        }

        let handle = PluginHandle::new(
            Arc::new(descriptor),
            data_dir,
            resources,
            self.services.clone(),
            &self.settings.config_file_name,
        )?;
        tracing::debug!("Registered plugin: {}", handle.descriptor().full_name());

        self.plugins.push(ManagedPlugin {
            handle,
            plugin: Box::new(plugin),
        });
        Ok(&self.plugins[self.plugins.len() - 1].handle)
    }

    /// Invokes `on_load` for every plugin that has not been loaded yet.
    pub fn load_all(&mut self) -> BatchReport {
        self.run_phase(PluginState::Constructed, ManagedPlugin::load)
    }

    /// Enables every loaded plugin.
    ///
    /// Refused while any registered plugin still awaits `on_load`.
    pub fn enable_all(&mut self) -> Result<BatchReport> {
        self.ensure_load_phase_complete()?;
        Ok(self.run_phase(PluginState::Loaded, ManagedPlugin::enable))
    }

    /// Loads then enables all newly registered plugins.
    pub fn start_batch(&mut self) -> Result<BatchReport> {
        let loaded = self.load_all();
        let enabled = self.enable_all()?;

        // Plugins that loaded fine are reported by the enable phase.
        let mut report = BatchReport {
            succeeded: Vec::new(),
            failures: loaded.failures,
        };
        report.merge(enabled);
        Ok(report)
    }

    /// Load a plugin by name
    pub fn load_plugin(&mut self, name: &str) -> Result<()> {
        self.get_mut(name)?.load()
    }

    /// Enable a plugin by name
    pub fn enable_plugin(&mut self, name: &str) -> Result<()> {
        self.ensure_load_phase_complete()?;
        self.get_mut(name)?.enable()
    }

    /// Disable a plugin by name
    pub fn disable_plugin(&mut self, name: &str) -> Result<()> {
        self.get_mut(name)?.disable()
    }

    /// Disables every enabled plugin, last registered first.
    pub fn disable_all(&mut self) -> BatchReport {
        let outcomes = self
            .plugins
            .iter_mut()
            .rev()
            .filter(|p| p.state() == PluginState::Enabled)
            .map(|p| (p.name().to_owned(), p.disable()))
            .collect();
        BatchReport::from_outcomes(outcomes)
    }

    /// Retires a plugin, dropping its instance and handle.
    pub fn discard_plugin(&mut self, name: &str) -> Result<()> {
        let index = self
            .find(name)
            .ok_or_else(|| PluginError::PluginNotFound(name.to_owned()))?;
        self.plugins[index]
            .handle
            .lifecycle()
            .transition(PluginState::Discarded)?;

        let managed = self.plugins.remove(index);
        tracing::debug!("Discarded plugin: {}", managed.handle.descriptor().full_name());
        Ok(())
    }

    /// Disables everything, then discards everything.
    pub fn shutdown(&mut self) -> BatchReport {
        let mut report = self.disable_all();
        for managed in self.plugins.drain(..) {
            if let Err(e) = managed.handle.lifecycle().transition(PluginState::Discarded) {
                tracing::error!("Failed to discard plugin {}: {}", managed.name(), e);
                report.failures.push((managed.name().to_owned(), e));
            }
        }
        tracing::info!("Plugin registry shut down");
        report
    }

    /// Routes a command to the enabled plugin declaring it.
    ///
    /// Returns the executor's verdict, or `false` when the plugin has no
    /// command capability.
    pub fn dispatch_command(&mut self, sender: &str, label: &str, args: &[String]) -> Result<bool> {
        let (index, command) = self
            .plugins
            .iter()
            .enumerate()
            .find_map(|(i, p)| {
                p.handle
                    .descriptor()
                    .command_for(label)
                    .map(|(command, _)| (i, command.to_owned()))
            })
            .ok_or_else(|| PluginError::UnknownCommand(label.to_owned()))?;

        let invocation = CommandInvocation {
            sender: sender.to_owned(),
            command,
            label: label.to_owned(),
            args: args.to_vec(),
        };
        self.plugins[index].dispatch(&invocation)
    }

    /// Get a plugin handle by name
    pub fn get(&self, name: &str) -> Option<&PluginHandle> {
        self.find(name).map(|i| &self.plugins[i].handle)
    }

    /// Check if a plugin is enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).map(PluginHandle::is_enabled).unwrap_or(false)
    }

    /// Plugin names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(ManagedPlugin::name)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &ManagedPlugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Get plugin statistics
    pub fn stats(&self) -> PluginRegistryStats {
        let mut stats = PluginRegistryStats {
            total_plugins: self.plugins.len(),
            ..Default::default()
        };

        for plugin in &self.plugins {
            match plugin.state() {
                PluginState::Constructed => stats.constructed_plugins += 1,
                PluginState::Loaded => stats.loaded_plugins += 1,
                PluginState::Enabled => stats.enabled_plugins += 1,
                PluginState::Disabled => stats.disabled_plugins += 1,
                PluginState::Failed => stats.failed_plugins += 1,
                PluginState::Discarded => {}
            }
        }

        stats
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut ManagedPlugin> {
        self.plugins
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| PluginError::PluginNotFound(name.to_owned()))
    }

    fn ensure_load_phase_complete(&self) -> Result<()> {
        let pending: Vec<String> = self
            .plugins
            .iter()
            .filter(|p| !p.state().has_loaded())
            .map(|p| p.name().to_owned())
            .collect();
        if pending.is_empty() {
            Ok(())
        } else {
            Err(PluginError::LoadPhaseIncomplete { pending })
        }
    }

    /// Runs `step` for every plugin in state `from`.
    ///
    /// The phase returns only once every step has finished, which is what
    /// separates the load phase from the enable phase.
    fn run_phase<F>(&mut self, from: PluginState, step: F) -> BatchReport
    where
        F: Fn(&mut ManagedPlugin) -> Result<()> + Send + Sync,
    {
        let outcomes: Vec<(String, Result<()>)> = if self.settings.parallel_lifecycle {
            self.plugins
                .par_iter_mut()
                .filter(|p| p.state() == from)
                .map(|p| (p.name().to_owned(), step(p)))
                .collect()
        } else {
            self.plugins
                .iter_mut()
                .filter(|p| p.state() == from)
                .map(|p| (p.name().to_owned(), step(p)))
                .collect()
        };
        BatchReport::from_outcomes(outcomes)
    }
}

/// Plugin registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginRegistryStats {
    pub total_plugins: usize,
    pub constructed_plugins: usize,
    pub loaded_plugins: usize,
    pub enabled_plugins: usize,
    pub disabled_plugins: usize,
    pub failed_plugins: usize,
}
