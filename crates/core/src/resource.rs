//! Read-only access to the assets a plugin ships with

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes};

/// Read-only view over a plugin's packaged assets.
///
/// Keys are forward-slash separated, case-sensitive and carry no leading
/// separator. A missing entry is reported as `None`, never as an error.
pub trait ResourceBundle: Send + Sync {
    /// Opens the entry at `path` for reading.
    fn get_resource(&self, path: &str) -> Option<Box<dyn Read + Send + '_>>;

    /// Whether an entry exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// All entry keys, sorted.
    fn entries(&self) -> Vec<String>;

    /// Reads the whole entry into memory.
    fn read_resource(&self, path: &str) -> Option<std::io::Result<Vec<u8>>> {
        let mut reader = self.get_resource(path)?;
        let mut buf = Vec::new();
        Some(reader.read_to_end(&mut buf).map(|_| buf))
    }
}

/// Returns true if `path` is a well-formed bundle key.
pub fn is_valid_resource_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.ends_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Bundle held entirely in memory.
///
/// This is the usual shape for plugins compiled into the host, with entries
/// coming from `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources {
    entries: BTreeMap<String, Bytes>,
}

impl EmbeddedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bundle from static `(path, contents)` pairs.
    pub fn from_static(entries: &[(&str, &'static [u8])]) -> Self {
        let mut bundle = Self::new();
        for (path, contents) in entries {
            bundle.insert(*path, Bytes::from_static(contents));
        }
        bundle
    }

    /// Adds an entry, replacing any previous one at the same key.
    ///
    /// Malformed keys are ignored with a warning since they could never be
    /// looked up.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Bytes>) {
        let path = path.into();
        if !is_valid_resource_path(&path) {
            tracing::warn!("Ignoring embedded resource with malformed path '{}'", path);
            return;
        }
        self.entries.insert(path, contents.into());
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_entry(mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceBundle for EmbeddedResources {
    fn get_resource(&self, path: &str) -> Option<Box<dyn Read + Send + '_>> {
        // Bytes clones are reference counted, the payload is not copied.
        let contents = self.entries.get(path)?.clone();
        Some(Box::new(contents.reader()))
    }

    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    fn entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Bundle backed by an unpacked directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, path: &str) -> Option<PathBuf> {
        if !is_valid_resource_path(path) {
            return None;
        }
        let full = path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg));
        full.is_file().then_some(full)
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in read_dir.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let path = entry.path();
            if path.is_dir() {
                self.collect(&path, &key, out);
            } else if path.is_file() {
                out.push(key);
            }
        }
    }
}

impl ResourceBundle for DirectoryResources {
    fn get_resource(&self, path: &str) -> Option<Box<dyn Read + Send + '_>> {
        let full = self.locate(path)?;
        match std::fs::File::open(&full) {
            Ok(file) => Some(Box::new(file)),
            Err(e) => {
                tracing::debug!("Resource {} could not be opened: {}", full.display(), e);
                None
            }
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.locate(path).is_some()
    }

    fn entries(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(&self.root, "", &mut out);
        out.sort();
        out
    }
}
