//! Per-plugin filesystem namespace

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{PluginError, Result};

/// Directory holding a plugin's configuration and extracted resources.
///
/// The directory may not exist yet. It is created on the first write and is
/// never removed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Conventional layout: `<plugins_dir>/<plugin name>`.
    ///
    /// The name must be a single plain path segment.
    pub fn for_plugin(plugins_dir: impl AsRef<Path>, plugin_name: &str) -> Result<Self> {
        let mut components = Path::new(plugin_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) if segment == plugin_name => {
                Ok(Self::new(plugins_dir.as_ref().join(segment)))
            }
            _ => Err(PluginError::InvalidArgument(format!(
                "plugin name '{plugin_name}' cannot be used as a directory name"
            ))),
        }
    }

    /// Whether either directory lies inside the other, or both are the same.
    pub fn overlaps(&self, other: &DataDirectory) -> bool {
        self.root.starts_with(&other.root) || other.root.starts_with(&self.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Creates the directory and its parents if they are missing.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.root).map_err(|e| PluginError::io(&self.root, e))?;
        tracing::debug!("Created data directory {}", self.root.display());
        Ok(())
    }

    /// Maps a forward-slash relative path to a location under the root.
    ///
    /// Absolute paths and paths escaping the root are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let normalized = relative.replace('\\', "/");
        if normalized.is_empty() {
            return Err(PluginError::InvalidArgument("path must not be empty".into()));
        }

        let mut out = self.root.clone();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(segment) => out.push(segment),
                Component::CurDir => {}
                _ => {
                    return Err(PluginError::InvalidArgument(format!(
                        "path '{relative}' must stay inside the data directory"
                    )))
                }
            }
        }

        if out == self.root {
            return Err(PluginError::InvalidArgument(format!(
                "path '{relative}' does not name a file"
            )));
        }
        Ok(out)
    }
}

/// Replaces `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = temp_sibling(path)?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PluginError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PluginError::io(path, e.error))?;
    Ok(())
}

/// Like [`write_atomic`] but leaves an existing file untouched.
///
/// Returns whether the file was written.
pub(crate) fn write_if_absent(path: &Path, contents: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let mut tmp = temp_sibling(path)?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PluginError::io(tmp.path(), e))?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(PluginError::io(path, e.error)),
    }
}

fn temp_sibling(path: &Path) -> Result<NamedTempFile> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| PluginError::io(parent, e))?;
    NamedTempFile::new_in(parent).map_err(|e| PluginError::io(parent, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_plugin_layout() {
        let dir = DataDirectory::for_plugin("/srv/plugins", "Greeter").unwrap();
        assert_eq!(dir.root(), Path::new("/srv/plugins/Greeter"));
    }

    #[test]
    fn test_for_plugin_rejects_non_segment_names() {
        for name in ["", ".", "..", "a/b", "a/", "/abs"] {
            assert!(
                matches!(
                    DataDirectory::for_plugin("/srv/plugins", name),
                    Err(PluginError::InvalidArgument(_))
                ),
                "{name:?} was accepted"
            );
        }
    }

    #[test]
    fn test_overlapping_roots() {
        let plugins = DataDirectory::new("/srv/plugins");
        let alpha = DataDirectory::new("/srv/plugins/Alpha");
        let alphabet = DataDirectory::new("/srv/plugins/Alphabet");

        assert!(alpha.overlaps(&alpha.clone()));
        assert!(plugins.overlaps(&alpha));
        assert!(alpha.overlaps(&plugins));
        assert!(!alpha.overlaps(&alphabet));
    }

    #[test]
    fn test_ensure_exists_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = DataDirectory::new(tmp.path().join("a/b/c"));
        assert!(!dir.exists());

        dir.ensure_exists().unwrap();
        dir.ensure_exists().unwrap();
        assert!(dir.exists());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let dir = DataDirectory::new("/data/plugin");
        assert_eq!(
            dir.resolve("lang/en.yml").unwrap(),
            Path::new("/data/plugin/lang/en.yml")
        );
        assert_eq!(
            dir.resolve("lang\\en.yml").unwrap(),
            Path::new("/data/plugin/lang/en.yml")
        );
        assert!(matches!(dir.resolve(""), Err(PluginError::InvalidArgument(_))));
        assert!(matches!(dir.resolve("../x"), Err(PluginError::InvalidArgument(_))));
        assert!(matches!(dir.resolve("/etc/passwd"), Err(PluginError::InvalidArgument(_))));
        assert!(matches!(dir.resolve("."), Err(PluginError::InvalidArgument(_))));
    }

    #[test]
    fn test_write_if_absent_keeps_existing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/file.txt");

        assert!(write_if_absent(&path, b"first").unwrap());
        assert!(!write_if_absent(&path, b"second").unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"third").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"third");
    }
}
