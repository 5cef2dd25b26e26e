use std::path::{Path, PathBuf};
use std::time::Duration;

use pbm_types::{ContainerPath, ImportJob};
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};

/// What to reset when a container stops making progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StagnationReset {
    /// Clear every success flag of the container so all its objects are
    /// imported again.
    #[default]
    All,
    /// Reset nothing. Failed objects never carry a success flag, so only
    /// they are retried.
    FailedOnly,
}

/// Tunables of an import run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Number of workers, each with its own compiler service session.
    pub workers: usize,
    /// Iterations that must pass before a run without improvement gives up.
    pub min_iterations: usize,
    /// Timeout of a single compiler service call, in seconds.
    pub call_timeout_secs: u64,
    pub stagnation_reset: StagnationReset,
    /// Container substituted from a resource instead of imported.
    pub reserved_container: String,
    /// Extension of binary sidecar files, without the dot.
    pub sidecar_extension: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            min_iterations: 3,
            call_timeout_secs: 60,
            stagnation_reset: StagnationReset::All,
            reserved_container: "pbdom.pbl".into(),
            sidecar_extension: "bin".into(),
        }
    }
}

impl ImportConfig {
    pub fn validate(&self) -> ImportResult<()> {
        if self.workers == 0 {
            return Err(ImportError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.min_iterations == 0 {
            return Err(ImportError::InvalidConfig("min_iterations must be at least 1".into()));
        }
        if self.call_timeout_secs == 0 {
            return Err(ImportError::InvalidConfig("call_timeout_secs must be at least 1".into()));
        }
        if self.sidecar_extension.is_empty() || self.sidecar_extension.starts_with('.') {
            return Err(ImportError::InvalidConfig(format!(
                "sidecar_extension must be a bare extension, got {:?}",
                self.sidecar_extension
            )));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Whether `container` is the reserved, substituted container.
    pub fn is_reserved(&self, container: &ContainerPath) -> bool {
        container.file_name() == self.reserved_container
    }
}

/// A complete run description, usually loaded from a TOML file:
///
/// ```toml
/// target = "app.pbt"
///
/// [config]
/// workers = 3
///
/// [[jobs]]
/// container = "lib/exf1.pbl"
/// source_dir = "src/exf1"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
    /// Build target the objects are compiled against.
    pub target: PathBuf,
    #[serde(default)]
    pub config: ImportConfig,
    #[serde(default)]
    pub jobs: Vec<ImportJob>,
}

impl ImportPlan {
    /// Parse a plan. Relative paths are kept as written.
    pub fn from_toml_str(s: &str) -> ImportResult<Self> {
        let plan: Self = toml::from_str(s).map_err(|e| ImportError::InvalidPlan(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan file. Relative paths are resolved against the directory
    /// containing the file.
    pub fn load(path: &Path) -> ImportResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut plan = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            plan.resolve_relative_to(base)?;
        }
        Ok(plan)
    }

    fn validate(&self) -> ImportResult<()> {
        self.config.validate()?;
        for job in &self.jobs {
            if job.container.as_path().file_name().is_none() {
                return Err(ImportError::InvalidPlan(format!(
                    "container {} has no file name",
                    job.container
                )));
            }
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) -> ImportResult<()> {
        let resolve = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.target = resolve(&self.target);
        for job in &mut self.jobs {
            let container = resolve(job.container.as_path());
            job.container =
                ContainerPath::new(container).map_err(|e| ImportError::InvalidPlan(e.to_string()))?;
            job.source_dir = resolve(&job.source_dir);
        }
        Ok(())
    }
}
