use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Path of a compiled library container (`lib/exf1.pbl`).
///
/// Containers are only ever mutated through the compiler service; this type
/// identifies one and never holds its content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerPath(PathBuf);

impl ContainerPath {
    /// Wrap a container path. The path must name a file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(TypeError::NoFileName(path.display().to_string()));
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// File name of the container (`exf1.pbl`), used as the key for
    /// container-level bookkeeping and reserved-name checks.
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without the extension (`exf1`).
    pub fn base_name(&self) -> String {
        self.0
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerPath({})", self.0.display())
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// One unit of import work: a container and the directory holding the
/// exported sources that belong to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub container: ContainerPath,
    pub source_dir: PathBuf,
}

impl ImportJob {
    pub fn new(container: ContainerPath, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            container,
            source_dir: source_dir.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_and_base_name() {
        let c = ContainerPath::new("lib/exf1.pbl").unwrap();
        assert_eq!(c.file_name(), "exf1.pbl");
        assert_eq!(c.base_name(), "exf1");
        assert_eq!(c.as_path(), Path::new("lib/exf1.pbl"));
    }

    #[test]
    fn rejects_path_without_file_name() {
        assert!(ContainerPath::new("..").is_err());
        assert!(ContainerPath::new("").is_err());
    }

    #[test]
    fn job_construction() {
        let job = ImportJob::new(ContainerPath::new("a.pbl").unwrap(), "src/a");
        assert_eq!(job.container.file_name(), "a.pbl");
        assert_eq!(job.source_dir, PathBuf::from("src/a"));
    }

    #[test]
    fn serde_is_transparent() {
        let c = ContainerPath::new("lib/exf1.pbl").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"lib/exf1.pbl\"");
    }
}
