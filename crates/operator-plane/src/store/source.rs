//! Content sources the store downloads metadata and key pair files from

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

use super::{Result, StoreError};

/// Where raw store content comes from
///
/// Implementations must be thread-safe; the refresh task and request
/// handlers may share one source.
#[async_trait]
pub trait ContentSource: Send + Sync + Debug {
    /// Fetch the bytes stored at `location`
    async fn download(&self, location: &str) -> Result<Vec<u8>>;
}

/// In-memory content source
///
/// Suitable for development and tests. Content is lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySource {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` at `location`, replacing anything already there
    pub fn put(&self, location: impl Into<String>, content: impl Into<Vec<u8>>) {
        let location = location.into();
        let content = content.into();
        debug!(location = %location, bytes = content.len(), "Storing content");
        self.objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(location, content);
    }

    pub fn remove(&self, location: &str) -> bool {
        self.objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(location)
            .is_some()
    }
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn download(&self, location: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }
}

/// Content source reading files below a root directory
///
/// Locations are relative paths. Absolute paths and `..` components are
/// rejected so a metadata document cannot point outside the root.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Using local content directory");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if location.is_empty() || escapes {
            return Err(StoreError::InvalidLocation(location.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentSource for LocalDirSource {
    async fn download(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(location.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
