//! Host-side settings for the plugin system

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigFormat, DEFAULT_CONFIG_FILE};

/// Settings the host reads at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSystemSettings {
    /// Parent of every plugin's data directory
    pub plugins_dir: PathBuf,
    /// Name of each plugin's configuration file inside its data directory
    pub config_file_name: String,
    /// Run one lifecycle phase for several plugins at once
    pub parallel_lifecycle: bool,
    pub log: LogSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub filter: String,
    pub format: LogFormat,
}

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for PluginSystemSettings {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            config_file_name: DEFAULT_CONFIG_FILE.to_string(),
            parallel_lifecycle: true,
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl PluginSystemSettings {
    /// Load settings from file with format detection
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let settings: PluginSystemSettings = match Self::format_of(path) {
            ConfigFormat::Toml => toml::from_str(&content)
                .map_err(|e| SettingsError::ParseFailed(format!("TOML parse error: {}", e)))?,
            ConfigFormat::Json => serde_json::from_str(&content)
                .map_err(|e| SettingsError::ParseFailed(format!("JSON parse error: {}", e)))?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content)
                .map_err(|e| SettingsError::ParseFailed(format!("YAML parse error: {}", e)))?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();

        let content = match Self::format_of(path) {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| SettingsError::ParseFailed(format!("TOML serialize error: {}", e)))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| SettingsError::ParseFailed(format!("JSON serialize error: {}", e)))?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| SettingsError::ParseFailed(format!("YAML serialize error: {}", e)))?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.plugins_dir.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("Plugins directory cannot be empty".to_string()));
        }

        let file = Path::new(&self.config_file_name);
        if self.config_file_name.is_empty()
            || file.file_name().map(|name| name != file.as_os_str()).unwrap_or(true)
        {
            return Err(SettingsError::Invalid(format!(
                "Config file name '{}' must be a bare file name",
                self.config_file_name
            )));
        }

        if ConfigFormat::from_extension(file).is_none() {
            return Err(SettingsError::Invalid(format!(
                "Config file name '{}' has no supported extension (yml, yaml, toml, json)",
                self.config_file_name
            )));
        }

        if self.log.filter.trim().is_empty() {
            return Err(SettingsError::Invalid("Log filter cannot be empty".to_string()));
        }

        Ok(())
    }

    fn format_of(path: &Path) -> ConfigFormat {
        ConfigFormat::from_extension(path).unwrap_or(ConfigFormat::Toml)
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse settings: {0}")]
    ParseFailed(String),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}
