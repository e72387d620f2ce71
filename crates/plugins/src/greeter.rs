//! Greeter plugin: answers `/greet` with a configurable greeting.
//!
//! Ships a default `config.yml`, extracts a farewell message on enable and
//! persists how many greetings it handed out when disabled.

use std::sync::Arc;

use anyhow::{Context, Result};
use kiln::{
    CommandExecutor, CommandInvocation, EmbeddedResources, Plugin, PluginDescriptor, PluginHandle,
};
use parking_lot::Mutex;
use serde::Deserialize;

/// Resource extracted into the data folder on enable.
pub const FAREWELL_RESOURCE: &str = "messages/farewell.txt";

const FALLBACK_GREETING: &str = "Hello";

/// Messages the plugin sent, newest last.
pub type Outbox = Arc<Mutex<Vec<String>>>;

/// Values read from the plugin's configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GreeterSettings {
    pub greetings: Vec<String>,
    pub prefix: String,
    pub times_greeted: u64,
}

impl Default for GreeterSettings {
    fn default() -> Self {
        Self {
            greetings: vec![FALLBACK_GREETING.to_string()],
            prefix: "[Greeter]".to_string(),
            times_greeted: 0,
        }
    }
}

/// Greeter plugin for Kiln
pub struct GreeterPlugin {
    settings: GreeterSettings,
    outbox: Outbox,
}

impl GreeterPlugin {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            settings: GreeterSettings::default(),
            outbox,
        }
    }

    /// The assets compiled into the plugin.
    pub fn bundle() -> EmbeddedResources {
        EmbeddedResources::from_static(&[
            ("plugin.yml", include_bytes!("../resources/greeter/plugin.yml").as_slice()),
            ("config.yml", include_bytes!("../resources/greeter/config.yml").as_slice()),
            (
                FAREWELL_RESOURCE,
                include_bytes!("../resources/greeter/messages/farewell.txt").as_slice(),
            ),
        ])
    }

    /// Parses the bundled `plugin.yml`.
    pub fn descriptor() -> kiln::Result<PluginDescriptor> {
        PluginDescriptor::from_bundle(&Self::bundle())
    }

    pub fn settings(&self) -> &GreeterSettings {
        &self.settings
    }

    fn read_settings(handle: &PluginHandle) -> Result<GreeterSettings> {
        let doc = handle.get_config();
        serde_json::from_value(serde_json::Value::Object(doc.into_map()))
            .context("greeter configuration has the wrong shape")
    }

    fn apply_settings(&mut self, handle: &PluginHandle) -> Result<()> {
        let mut settings = Self::read_settings(handle)?;
        if settings.greetings.is_empty() {
            handle.nag("no greetings configured, falling back to the default greeting");
            settings.greetings.push(FALLBACK_GREETING.to_string());
        }
        self.settings = settings;
        Ok(())
    }

    fn send(&self, message: String) {
        tracing::info!("{}", message);
        self.outbox.lock().push(message);
    }

    fn greet(&mut self, invocation: &CommandInvocation) -> bool {
        let target = invocation.args.first().unwrap_or(&invocation.sender);
        let index = fastrand::usize(..self.settings.greetings.len());
        let message = format!(
            "{} {}, {}!",
            self.settings.prefix, self.settings.greetings[index], target
        );
        self.settings.times_greeted += 1;
        self.send(message);
        true
    }

    fn set_greeting(
        &mut self,
        handle: &PluginHandle,
        invocation: &CommandInvocation,
    ) -> Result<bool> {
        if invocation.args.is_empty() {
            return Ok(false);
        }
        let greeting = invocation.args.join(" ");
        handle
            .config_store()
            .update_config(|doc| doc.set("greetings", vec![greeting.clone()]));
        handle.save_config()?;
        self.settings.greetings = vec![greeting];
        self.send(format!("{} Greeting updated", self.settings.prefix));
        Ok(true)
    }
}

impl Plugin for GreeterPlugin {
    fn on_load(&mut self, handle: &PluginHandle) -> Result<()> {
        handle.save_default_config()?;
        Ok(())
    }

    fn on_enable(&mut self, handle: &PluginHandle) -> Result<()> {
        handle.save_resource(FAREWELL_RESOURCE, false)?;
        handle.reload_config()?;
        self.apply_settings(handle)?;
        tracing::info!(
            "Greeter ready with {} greeting(s) on {}",
            self.settings.greetings.len(),
            handle.server().name()
        );
        Ok(())
    }

    fn on_disable(&mut self, handle: &PluginHandle) -> Result<()> {
        let count = self.settings.times_greeted;
        handle
            .config_store()
            .update_config(|doc| doc.set("times_greeted", count));
        handle.save_config()?;

        let path = handle.data_folder().join(FAREWELL_RESOURCE);
        match std::fs::read_to_string(&path) {
            Ok(farewell) if !farewell.trim().is_empty() => {
                self.send(format!("{} {}", self.settings.prefix, farewell.trim()));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not read farewell message {}: {}", path.display(), e),
        }
        Ok(())
    }

    fn command_executor(&mut self) -> Option<&mut dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for GreeterPlugin {
    fn on_command(
        &mut self,
        handle: &PluginHandle,
        invocation: &CommandInvocation,
    ) -> Result<bool> {
        match invocation.command.as_str() {
            "greet" => Ok(self.greet(invocation)),
            "setgreeting" => self.set_greeting(handle, invocation),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_descriptor() {
        let descriptor = GreeterPlugin::descriptor().unwrap();
        assert_eq!(descriptor.name, "Greeter");
        assert_eq!(descriptor.version, "1.0.0");
        assert!(descriptor.has_capability(kiln::plugin::descriptor::CAPABILITY_COMMANDS));
        assert_eq!(descriptor.command_for("hi").map(|(name, _)| name), Some("greet"));
    }

    #[test]
    fn test_bundle_contents() {
        use kiln::ResourceBundle;

        let bundle = GreeterPlugin::bundle();
        assert!(bundle.contains("config.yml"));
        assert!(bundle.contains(FAREWELL_RESOURCE));
        assert!(bundle.get_resource("messages").is_none());
    }

    #[test]
    fn test_settings_defaults_fill_missing_keys() {
        let settings: GreeterSettings =
            serde_json::from_value(serde_json::json!({"prefix": ">>"})).unwrap();
        assert_eq!(settings.prefix, ">>");
        assert_eq!(settings.greetings, vec!["Hello"]);
        assert_eq!(settings.times_greeted, 0);
    }
}
