use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use pbm_orca::{Connector, ResourceProvider};
use pbm_types::{ContainerPath, ImportJob};
use tracing::{debug, info};

use crate::config::{ImportConfig, ImportPlan};
use crate::error::{ImportError, ImportResult};
use crate::pool::{run_iteration, PoolContext};
use crate::report::{ImportReport, IterationReport};
use crate::state::RunState;

/// Imports sources into several containers, retrying until every object
/// compiles or retries stop helping.
///
/// Objects in different containers may reference each other in cycles, so
/// no single order works. Each iteration imports every container that still
/// has errors; objects that already succeeded are skipped. Between
/// iterations the container order is rotated by one, and a container whose
/// success count stalls gets its success flags reset.
pub struct MultiImport {
    target: PathBuf,
    jobs: Vec<ImportJob>,
    config: ImportConfig,
    connector: Arc<dyn Connector>,
    resources: Arc<dyn ResourceProvider>,
}

impl MultiImport {
    pub fn new(
        target: impl Into<PathBuf>,
        jobs: Vec<ImportJob>,
        connector: Arc<dyn Connector>,
        resources: Arc<dyn ResourceProvider>,
    ) -> Self {
        Self {
            target: target.into(),
            jobs,
            config: ImportConfig::default(),
            connector,
            resources,
        }
    }

    pub fn from_plan(plan: ImportPlan, connector: Arc<dyn Connector>, resources: Arc<dyn ResourceProvider>) -> Self {
        Self::new(plan.target, plan.jobs, connector, resources).with_config(plan.config)
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Run the import to a fixed point.
    ///
    /// Success flags live only for the duration of this call; a second call
    /// starts from scratch.
    pub async fn import(&self) -> ImportResult<ImportReport> {
        self.config.validate()?;
        let started = Instant::now();
        let mut report = ImportReport::default();
        if self.jobs.is_empty() {
            info!("no containers to import");
            return Ok(report);
        }

        let state = Arc::new(RunState::new());
        let ctx = Arc::new(PoolContext {
            target: self.target.clone(),
            config: self.config.clone(),
            state: Arc::clone(&state),
            connector: Arc::clone(&self.connector),
            resources: Arc::clone(&self.resources),
        });

        let min_iterations = self.config.min_iterations;
        let max_iterations = 3 * self.jobs.len();
        let mut order = self.jobs.clone();
        let mut last_errors = usize::MAX;
        let mut previous_success: HashMap<ContainerPath, usize> = HashMap::new();
        let mut iteration = 0;

        info!(
            containers = order.len(),
            workers = self.config.workers,
            min_iterations,
            max_iterations,
            "starting import"
        );

        loop {
            iteration += 1;
            let iteration_started = Instant::now();
            state.begin_iteration();

            let pending: Vec<ImportJob> = order
                .iter()
                .filter(|job| iteration == 1 || state.last_error_count(&job.container) != Some(0))
                .cloned()
                .collect();
            let processed: Vec<ContainerPath> = pending.iter().map(|job| job.container.clone()).collect();
            debug!(iteration, pending = pending.len(), "iteration started");

            run_iteration(Arc::clone(&ctx), pending).await?;

            let errors = state.finish_iteration(&processed);
            let elapsed = iteration_started.elapsed();
            report.iterations.push(IterationReport {
                iteration,
                errors,
                elapsed,
            });
            info!(iteration, errors, elapsed_ms = elapsed.as_millis() as u64, "iteration finished");

            if errors == 0 {
                report.total_elapsed = started.elapsed();
                info!(iterations = iteration, "import succeeded");
                return Ok(report);
            }
            if errors >= last_errors && iteration > min_iterations {
                return Err(ImportError::NotConverged {
                    iteration,
                    errors,
                    report: state.error_report(),
                });
            }
            if iteration >= max_iterations {
                return Err(ImportError::IterationCap {
                    iteration,
                    errors,
                    report: state.error_report(),
                });
            }

            for container in &processed {
                let succeeded = state.success_count(container);
                let before = previous_success.insert(container.clone(), succeeded).unwrap_or(0);
                if state.error_count(container) > 0 && succeeded == before {
                    debug!(container = %container.file_name(), succeeded, policy = ?self.config.stagnation_reset, "no progress, resetting");
                    state.reset(container, self.config.stagnation_reset);
                }
            }

            order.rotate_left(1);
            last_errors = errors;
        }
    }
}
