//! Loading, layering and persisting a plugin's configuration file

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{ConfigDocument, ConfigFormat};
use crate::data_dir::{self, DataDirectory};
use crate::error::{PluginError, Result};
use crate::resource::ResourceBundle;

/// File name used when the host does not configure one.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Owns the live [`ConfigDocument`] of one plugin.
///
/// The embedded resource with the same name as the config file serves as
/// both the template written by [`save_default_config`](Self::save_default_config)
/// and the source of fallback values for keys the user file leaves out.
///
/// All file operations are serialized through an internal lock, so a save
/// and a reload never interleave.
pub struct ConfigStore {
    plugin: String,
    file_name: String,
    path: PathBuf,
    format: ConfigFormat,
    data_dir: DataDirectory,
    resources: Arc<dyn ResourceBundle>,
    document: RwLock<Option<ConfigDocument>>,
    load_failure: RwLock<Option<LoadFailure>>,
    io: Mutex<()>,
}

/// Why the live document is a stand-in for an unreadable user file.
#[derive(Debug, Clone)]
enum LoadFailure {
    Parse {
        path: PathBuf,
        message: String,
    },
    Io {
        path: PathBuf,
        kind: ErrorKind,
        message: String,
    },
}

impl LoadFailure {
    fn record(error: &PluginError, fallback_path: &Path) -> Self {
        match error {
            PluginError::ConfigParse { path, message } => Self::Parse {
                path: path.clone(),
                message: message.clone(),
            },
            PluginError::Io { path, source } => Self::Io {
                path: path.clone(),
                kind: source.kind(),
                message: source.to_string(),
            },
            other => Self::Parse {
                path: fallback_path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }

    fn to_error(&self) -> PluginError {
        match self {
            Self::Parse { path, message } => PluginError::parse(path, message),
            Self::Io {
                path,
                kind,
                message,
            } => PluginError::io(path, io::Error::new(*kind, message.clone())),
        }
    }
}

impl ConfigStore {
    /// Creates a store for `file_name` inside `data_dir`.
    ///
    /// Nothing is read until the configuration is first requested.
    pub fn new(
        plugin: impl Into<String>,
        data_dir: DataDirectory,
        resources: Arc<dyn ResourceBundle>,
        file_name: &str,
    ) -> Result<Self> {
        let path = data_dir.resolve(file_name)?;
        let format = ConfigFormat::from_extension(&path).unwrap_or(ConfigFormat::Yaml);

        Ok(Self {
            plugin: plugin.into(),
            file_name: file_name.replace('\\', "/"),
            path,
            format,
            data_dir,
            resources,
            document: RwLock::new(None),
            load_failure: RwLock::new(None),
            io: Mutex::new(()),
        })
    }

    /// Location of the user configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn data_dir(&self) -> &DataDirectory {
        &self.data_dir
    }

    /// Returns a snapshot of the current document, loading it on first use.
    ///
    /// First use reads the user file layered over the embedded default, or
    /// the embedded default alone when no file exists. Nothing is written.
    /// A file that cannot be read or parsed is logged and the embedded
    /// default is served instead. Until a successful
    /// [`reload_config`](Self::reload_config) or a
    /// [`set_config`](Self::set_config), [`save_config`](Self::save_config)
    /// refuses to overwrite that file and returns the load error.
    pub fn get_config(&self) -> ConfigDocument {
        if let Some(doc) = self.document.read().as_ref() {
            return doc.clone();
        }

        let _io = self.io.lock();
        if let Some(doc) = self.document.read().as_ref() {
            return doc.clone();
        }

        let doc = match self.read_layered() {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(
                    "Plugin {}: could not load {}: {}",
                    self.plugin,
                    self.path.display(),
                    e
                );
                *self.load_failure.write() = Some(LoadFailure::record(&e, &self.path));
                self.embedded_default().ok().flatten().unwrap_or_default()
            }
        };
        *self.document.write() = Some(doc.clone());
        doc
    }

    /// Mutates the live document in place.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut ConfigDocument) -> R) -> R {
        if self.document.read().is_none() {
            self.get_config();
        }
        let mut guard = self.document.write();
        f(guard.get_or_insert_with(ConfigDocument::new))
    }

    /// Replaces the live document wholesale.
    ///
    /// The new document may be saved even if the user file failed to load.
    pub fn set_config(&self, doc: ConfigDocument) {
        *self.document.write() = Some(doc);
        *self.load_failure.write() = None;
    }

    /// Discards the in-memory document and reads it again from disk.
    ///
    /// On failure the previous document stays in place.
    pub fn reload_config(&self) -> Result<()> {
        let _io = self.io.lock();
        let doc = self.read_layered()?;
        *self.document.write() = Some(doc);
        *self.load_failure.write() = None;
        tracing::debug!("Plugin {}: reloaded {}", self.plugin, self.path.display());
        Ok(())
    }

    /// Writes the current document to the config file.
    ///
    /// The data directory is created if needed and the file is replaced
    /// atomically. Fails without writing while the user file is known to be
    /// unreadable.
    pub fn save_config(&self) -> Result<()> {
        self.get_config();

        let _io = self.io.lock();
        if let Some(failure) = self.load_failure.read().as_ref() {
            tracing::warn!(
                "Plugin {}: not saving over {}, it failed to load",
                self.plugin,
                self.path.display()
            );
            return Err(failure.to_error());
        }
        let text = {
            let guard = self.document.read();
            let empty = ConfigDocument::new();
            let doc = guard.as_ref().unwrap_or(&empty);
            self.serialize(doc.as_map())?
        };

        self.data_dir.ensure_exists()?;
        data_dir::write_atomic(&self.path, text.as_bytes())?;
        tracing::debug!("Plugin {}: saved {}", self.plugin, self.path.display());
        Ok(())
    }

    /// Writes the raw embedded default to disk unless a file already exists.
    ///
    /// Without an embedded default an empty document is written. Returns
    /// whether anything was written.
    pub fn save_default_config(&self) -> Result<bool> {
        let _io = self.io.lock();
        if self.path.exists() {
            return Ok(false);
        }

        let contents = match self.resources.read_resource(&self.file_name) {
            Some(Ok(raw)) => raw,
            Some(Err(e)) => return Err(PluginError::io(&self.file_name, e)),
            None => self.serialize(&serde_json::Map::new())?.into_bytes(),
        };

        self.data_dir.ensure_exists()?;
        let written = data_dir::write_if_absent(&self.path, &contents)?;
        if written {
            tracing::info!(
                "Plugin {}: wrote default configuration to {}",
                self.plugin,
                self.path.display()
            );
        }
        Ok(written)
    }

    /// Copies an embedded resource to the same relative path in the data
    /// directory.
    ///
    /// An existing file is only overwritten when `replace` is set.
    pub fn save_resource(&self, resource_path: &str, replace: bool) -> Result<()> {
        let resource_path = resource_path.replace('\\', "/");
        if resource_path.is_empty() {
            return Err(PluginError::InvalidArgument(
                "resource path cannot be empty".into(),
            ));
        }

        let contents = match self.resources.read_resource(&resource_path) {
            Some(Ok(contents)) => contents,
            Some(Err(e)) => return Err(PluginError::io(&resource_path, e)),
            None => {
                return Err(PluginError::InvalidArgument(format!(
                    "the embedded resource '{resource_path}' cannot be found"
                )))
            }
        };
        let destination = self.data_dir.resolve(&resource_path)?;

        let _io = self.io.lock();
        if destination.exists() && !replace {
            tracing::warn!(
                "Plugin {}: could not save {} to {} because it already exists",
                self.plugin,
                resource_path,
                destination.display()
            );
            return Ok(());
        }

        self.data_dir.ensure_exists()?;
        data_dir::write_atomic(&destination, &contents)?;
        tracing::debug!(
            "Plugin {}: extracted {} to {}",
            self.plugin,
            resource_path,
            destination.display()
        );
        Ok(())
    }

    /// Parses the embedded default, if the plugin ships one.
    pub fn embedded_default(&self) -> Result<Option<ConfigDocument>> {
        let raw = match self.resources.read_resource(&self.file_name) {
            None => return Ok(None),
            Some(Err(e)) => return Err(PluginError::io(&self.file_name, e)),
            Some(Ok(raw)) => raw,
        };
        let origin = PathBuf::from(format!("<embedded>/{}", self.file_name));
        let text = String::from_utf8(raw).map_err(|e| PluginError::parse(&origin, e))?;
        let map = self
            .format
            .parse_map(&text)
            .map_err(|e| PluginError::parse(&origin, e))?;
        Ok(Some(ConfigDocument::from_map(map)))
    }

    fn serialize(&self, map: &serde_json::Map<String, serde_json::Value>) -> Result<String> {
        self.format
            .serialize_map(map)
            .map_err(|e| PluginError::io(&self.path, io::Error::new(ErrorKind::InvalidData, e)))
    }

    fn read_user_file(&self) -> Result<Option<ConfigDocument>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(PluginError::parse(&self.path, e))
            }
            Err(e) => return Err(PluginError::io(&self.path, e)),
        };
        let map = self
            .format
            .parse_map(&text)
            .map_err(|e| PluginError::parse(&self.path, e))?;
        Ok(Some(ConfigDocument::from_map(map)))
    }

    fn read_layered(&self) -> Result<ConfigDocument> {
        let user = self.read_user_file()?;
        let defaults = self.embedded_default()?;

        Ok(match (user, defaults) {
            (Some(user), Some(defaults)) => ConfigDocument::layered(user, &defaults),
            (Some(user), None) => user,
            (None, Some(defaults)) => defaults,
            (None, None) => ConfigDocument::new(),
        })
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("plugin", &self.plugin)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("loaded", &self.document.read().is_some())
            .field("load_failed", &self.load_failure.read().is_some())
            .finish()
    }
}
