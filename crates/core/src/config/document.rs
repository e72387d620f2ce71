//! In-memory configuration tree

use serde_json::{Map, Value};

/// Separator between the segments of a configuration path.
pub const PATH_SEPARATOR: char = '.';

/// A plugin's loaded configuration.
///
/// Keys keep their file order. Values are addressed by dotted paths, so
/// `limits.max` names the `max` entry of the `limits` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Layers `defaults` under `user` one level deep.
    ///
    /// Every top-level key of `user` wins as a whole, nested sections are not
    /// merged. Keys keep the order of the defaults, followed by the keys only
    /// the user document has.
    pub fn layered(user: ConfigDocument, defaults: &ConfigDocument) -> Self {
        let mut user = user.root;
        let mut merged = Map::with_capacity(user.len().max(defaults.root.len()));

        for (key, default) in &defaults.root {
            let value = user.remove(key).unwrap_or_else(|| default.clone());
            merged.insert(key.clone(), value);
        }
        merged.extend(user);

        Self { root: merged }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next()?;
        segments.try_fold(self.root.get(first)?, |node, segment| {
            node.as_object()?.get(segment)
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_i64()
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    pub fn get_list(&self, path: &str) -> Option<&[Value]> {
        self.get(path)?.as_array().map(Vec::as_slice)
    }

    /// String entries of a list, skipping anything that is not a string.
    pub fn get_string_list(&self, path: &str) -> Option<Vec<String>> {
        let list = self.get_list(path)?;
        Some(
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        )
    }

    /// Sets the value at `path`, creating sections along the way.
    ///
    /// A non-section value found along the path is replaced by a section.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in segments {
            let entry = node
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            node = map;
        }
        node.insert(last.to_owned(), value.into());
    }

    /// Removes and returns the value at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once(PATH_SEPARATOR) {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let map = match parent {
            None => &mut self.root,
            Some(parent) => {
                let mut node = &mut self.root;
                for segment in parent.split(PATH_SEPARATOR) {
                    node = node.get_mut(segment)?.as_object_mut()?;
                }
                node
            }
        };
        map.shift_remove(last)
    }
}

impl From<Map<String, Value>> for ConfigDocument {
    fn from(root: Map<String, Value>) -> Self {
        Self::from_map(root)
    }
}
