//! Configuration file formats

use std::path::Path;

use serde_json::{Map, Value};

/// Configuration file format detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detects the format from the file extension, if it is a known one.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }

    /// Parses a document whose root must be a mapping.
    ///
    /// Blank input is an empty mapping.
    pub fn parse_map(self, text: &str) -> Result<Map<String, Value>, String> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = match self {
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| format!("YAML parse error: {e}"))?,
            Self::Toml => toml::from_str(text).map_err(|e| format!("TOML parse error: {e}"))?,
            Self::Json => serde_json::from_str(text).map_err(|e| format!("JSON parse error: {e}"))?,
        };

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(format!(
                "expected a mapping at the document root, found {}",
                kind_of(&other)
            )),
        }
    }

    /// Serializes a mapping in this format.
    pub fn serialize_map(self, map: &Map<String, Value>) -> Result<String, String> {
        match self {
            Self::Yaml => {
                serde_yaml::to_string(map).map_err(|e| format!("YAML serialize error: {e}"))
            }
            Self::Toml => {
                toml::to_string_pretty(map).map_err(|e| format!("TOML serialize error: {e}"))
            }
            Self::Json => serde_json::to_string_pretty(map)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| format!("JSON serialize error: {e}")),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
