//! Plugin metadata parsed from `plugin.yml`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, Result};
use crate::resource::ResourceBundle;

/// Bundle entry holding the descriptor.
pub const DESCRIPTOR_FILE: &str = "plugin.yml";

/// Capability string for plugins that handle commands.
pub const CAPABILITY_COMMANDS: &str = "commands";
/// Capability string for plugins that provide world generators.
pub const CAPABILITY_WORLD_GENERATOR: &str = "world-generator";
/// Capability string for plugins that use the host database.
pub const CAPABILITY_DATABASE: &str = "database";

/// Immutable plugin metadata.
///
/// Parsed once when the plugin is registered and shared read-only after
/// that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct PluginDescriptor {
    /// Plugin name, unique within a host
    pub name: String,
    /// Free-form version string
    pub version: String,
    /// Entry point identifier, meaningful to the loader only
    pub main: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub website: Option<String>,
    /// Plugins that must be present
    pub depend: Vec<String>,
    /// Plugins that are used when present
    pub softdepend: Vec<String>,
    /// Declared capabilities, e.g. `commands`
    pub capabilities: Vec<String>,
    /// Declared commands keyed by name
    pub commands: BTreeMap<String, CommandDescriptor>,
}

/// A command declared in the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub aliases: Vec<String>,
}

impl PluginDescriptor {
    /// Create a new descriptor
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            main: None,
            description: None,
            authors: Vec::new(),
            website: None,
            depend: Vec::new(),
            softdepend: Vec::new(),
            capabilities: Vec::new(),
            commands: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_command(mut self, name: impl Into<String>, command: CommandDescriptor) -> Self {
        self.commands.insert(name.into(), command);
        self
    }

    /// Parses a `plugin.yml` document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| PluginError::InvalidDescriptor(e.to_string()))
    }

    /// Reads `plugin.yml` from the plugin's bundle.
    pub fn from_bundle(bundle: &dyn ResourceBundle) -> Result<Self> {
        let raw = bundle
            .read_resource(DESCRIPTOR_FILE)
            .ok_or_else(|| {
                PluginError::InvalidDescriptor(format!("{DESCRIPTOR_FILE} not found in bundle"))
            })?
            .map_err(|e| PluginError::io(DESCRIPTOR_FILE, e))?;
        let text = String::from_utf8(raw)
            .map_err(|e| PluginError::InvalidDescriptor(format!("{DESCRIPTOR_FILE}: {e}")))?;
        Self::from_yaml(&text)
    }

    /// Checks the invariants the host relies on.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PluginError::InvalidDescriptor("name must not be empty".into()));
        }
        if !self.name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(PluginError::InvalidDescriptor(format!(
                "name '{}' must start with a letter or digit",
                self.name
            )));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-'))
        {
            return Err(PluginError::InvalidDescriptor(format!(
                "name '{}' contains invalid characters",
                self.name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(PluginError::InvalidDescriptor(format!(
                "plugin '{}' has an empty version",
                self.name
            )));
        }
        if self.capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(PluginError::InvalidDescriptor(format!(
                "plugin '{}' declares an empty capability",
                self.name
            )));
        }
        Ok(())
    }

    /// `name vversion`, as shown in logs.
    pub fn full_name(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Finds the declared command answering to `label`, by name or alias.
    pub fn command_for(&self, label: &str) -> Option<(&str, &CommandDescriptor)> {
        self.commands
            .iter()
            .find(|(name, command)| {
                name.eq_ignore_ascii_case(label)
                    || command.aliases.iter().any(|a| a.eq_ignore_ascii_case(label))
            })
            .map(|(name, command)| (name.as_str(), command))
    }
}

/// Wire shape of `plugin.yml`.
#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    #[serde(deserialize_with = "scalar_string")]
    version: String,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    authors: Vec<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    depend: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    softdepend: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    capabilities: Vec<String>,
    #[serde(default)]
    commands: Option<BTreeMap<String, Option<CommandDescriptor>>>,
}

impl TryFrom<RawDescriptor> for PluginDescriptor {
    type Error = PluginError;

    fn try_from(raw: RawDescriptor) -> Result<Self> {
        let mut authors = Vec::new();
        if let Some(author) = raw.author {
            authors.push(author);
        }
        authors.extend(raw.authors);

        let commands = raw
            .commands
            .unwrap_or_default()
            .into_iter()
            .map(|(name, command)| (name, command.unwrap_or_default()))
            .collect();

        let descriptor = Self {
            name: raw.name,
            version: raw.version,
            main: raw.main,
            description: raw.description,
            authors,
            website: raw.website,
            depend: raw.depend,
            softdepend: raw.softdepend,
            capabilities: raw.capabilities,
            commands,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Versions such as `1.0` arrive as numbers from YAML.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(value) => value,
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
    })
}
