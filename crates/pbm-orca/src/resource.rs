use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{OrcaError, OrcaResult};

/// Source of known-good binary blobs for containers that cannot be rebuilt
/// from source.
pub trait ResourceProvider: Send + Sync {
    /// Fetch the blob stored under `name` (a container file name).
    fn fetch(&self, name: &str) -> OrcaResult<Vec<u8>>;
}

/// Blobs stored as files in one directory, keyed by file name.
#[derive(Clone, Debug)]
pub struct DirResourceProvider {
    root: PathBuf,
}

impl DirResourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for DirResourceProvider {
    fn fetch(&self, name: &str) -> OrcaResult<Vec<u8>> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OrcaError::ResourceNotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory resource map.
pub struct MemoryResourceProvider {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryResourceProvider {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Store a blob, replacing any previous one with the same name.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(name.into(), bytes.into());
    }
}

impl Default for MemoryResourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for MemoryResourceProvider {
    fn fetch(&self, name: &str) -> OrcaResult<Vec<u8>> {
        self.blobs
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| OrcaError::ResourceNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_provider_reads_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pbdom.pbl"), b"HDR*blob").unwrap();

        let provider = DirResourceProvider::new(dir.path());
        assert_eq!(provider.fetch("pbdom.pbl").unwrap(), b"HDR*blob");
        assert!(matches!(
            provider.fetch("other.pbl"),
            Err(OrcaError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn memory_provider_insert_and_fetch() {
        let provider = MemoryResourceProvider::new();
        provider.insert("pbdom.pbl", b"one".to_vec());
        provider.insert("pbdom.pbl", b"two".to_vec());
        assert_eq!(provider.fetch("pbdom.pbl").unwrap(), b"two");
        assert!(provider.fetch("missing.pbl").is_err());
    }
}
