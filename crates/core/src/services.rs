//! Host-owned services handed to every plugin
//!
//! The plugin contract only stores and forwards these references. Their
//! behavior belongs to the host.

use std::sync::Arc;

/// The running server.
pub trait Server: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
}

/// The loader that produced a plugin instance.
pub trait PluginLoader: Send + Sync {
    fn name(&self) -> &str;
}

/// Persistent storage handle shared with plugins.
pub trait Database: Send + Sync {
    fn name(&self) -> &str;
}

/// Chunk generator for a world. Generation itself is host territory.
pub trait ChunkGenerator: Send + Sync {
    fn name(&self) -> &str;
}

/// Looks up the generator configured for a default world.
pub trait WorldGeneratorFactory: Send + Sync {
    /// `id` is the generator id from the server configuration, if one was
    /// given.
    fn default_world_generator(
        &self,
        world_name: &str,
        id: Option<&str>,
    ) -> Option<Arc<dyn ChunkGenerator>>;
}

/// Static server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Server for ServerInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Loader for plugins linked into the host binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl PluginLoader for BuiltinLoader {
    fn name(&self) -> &str {
        "builtin"
    }
}

/// Factory for hosts without custom world generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWorldGenerators;

impl WorldGeneratorFactory for NoWorldGenerators {
    fn default_world_generator(
        &self,
        _world_name: &str,
        _id: Option<&str>,
    ) -> Option<Arc<dyn ChunkGenerator>> {
        None
    }
}

/// The set of service references a plugin handle holds.
#[derive(Clone)]
pub struct HostServices {
    server: Arc<dyn Server>,
    loader: Arc<dyn PluginLoader>,
    database: Arc<dyn Database>,
    generators: Arc<dyn WorldGeneratorFactory>,
}

impl HostServices {
    pub fn new(
        server: Arc<dyn Server>,
        loader: Arc<dyn PluginLoader>,
        database: Arc<dyn Database>,
        generators: Arc<dyn WorldGeneratorFactory>,
    ) -> Self {
        Self {
            server,
            loader,
            database,
            generators,
        }
    }

    pub fn server(&self) -> &Arc<dyn Server> {
        &self.server
    }

    pub fn loader(&self) -> &Arc<dyn PluginLoader> {
        &self.loader
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    pub fn generators(&self) -> &Arc<dyn WorldGeneratorFactory> {
        &self.generators
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("server", &self.server.name())
            .field("loader", &self.loader.name())
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}
