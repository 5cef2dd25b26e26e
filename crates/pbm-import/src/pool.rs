//! Worker pool running one import iteration.
//!
//! Containers are handed out through a bounded queue. Every worker opens its
//! own compiler session and imports whole containers, one at a time. A worker
//! whose session fails stops, as long as another worker is still active to
//! drain the queue; the last active worker turns the failure into a run
//! abort instead.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pbm_binsec::BinarySection;
use pbm_orca::{read_source, CompilerService, Connector, OrcaError, OrcaResult, ResourceProvider};
use pbm_order::{plan_sources, PlannedSource};
use pbm_types::{ImportJob, ObjectName};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportError, ImportResult};
use crate::report::{ErrorKind, ObjectError};
use crate::state::RunState;

/// Everything a worker needs besides its session.
pub(crate) struct PoolContext {
    pub target: PathBuf,
    pub config: ImportConfig,
    pub state: Arc<RunState>,
    pub connector: Arc<dyn Connector>,
    pub resources: Arc<dyn ResourceProvider>,
}

/// Why a worker stopped processing a container early.
struct Crash {
    object: String,
    message: String,
}

/// Import `jobs` with a fresh set of workers and wait for all of them.
pub(crate) async fn run_iteration(ctx: Arc<PoolContext>, jobs: Vec<ImportJob>) -> ImportResult<()> {
    let workers = ctx.config.workers;
    let (tx, rx) = mpsc::channel::<ImportJob>(workers);
    let rx = Arc::new(Mutex::new(rx));
    let active = Arc::new(AtomicUsize::new(workers));

    let handles: Vec<_> = (1..=workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                Arc::clone(&ctx),
                Arc::clone(&rx),
                Arc::clone(&active),
            ))
        })
        .collect();
    drop(rx);

    for job in jobs {
        if tx.send(job).await.is_err() {
            // Every worker is gone; the fatal error surfaces below.
            break;
        }
    }
    drop(tx);

    let mut fatal = None;
    for handle in handles {
        if let Err(e) = handle.await? {
            fatal.get_or_insert(e);
        }
    }
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn worker(
    id: usize,
    ctx: Arc<PoolContext>,
    rx: Arc<Mutex<mpsc::Receiver<ImportJob>>>,
    active: Arc<AtomicUsize>,
) -> ImportResult<()> {
    let timeout = ctx.config.call_timeout();
    let mut session = match call(timeout, ctx.connector.connect(id)).await {
        Ok(session) => session,
        Err(e) => {
            return leave_after_crash(
                id,
                &active,
                Crash {
                    object: "<connect>".into(),
                    message: e.to_string(),
                },
            )
        }
    };
    debug!(worker = id, "worker started");

    loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else { break };

        if let Some(crash) = process_container(id, &ctx, session.as_mut(), &job).await {
            return leave_after_crash(id, &active, crash);
        }
    }

    active.fetch_sub(1, Ordering::SeqCst);
    if let Err(e) = call(timeout, session.close()).await {
        debug!(worker = id, error = %e, "closing session failed");
    }
    debug!(worker = id, "worker finished");
    Ok(())
}

/// Stop a worker whose session failed, unless it is the last active one.
fn leave_after_crash(id: usize, active: &AtomicUsize, crash: Crash) -> ImportResult<()> {
    let left = active.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
        (n > 1).then(|| n - 1)
    });
    match left {
        Ok(before) => {
            warn!(
                worker = id,
                object = %crash.object,
                error = %crash.message,
                remaining_workers = before - 1,
                "worker shutting down after connection failure"
            );
            Ok(())
        }
        Err(_) => Err(ImportError::ConnectionExhausted {
            worker: id,
            object: crash.object,
            message: crash.message,
        }),
    }
}

/// Import every pending object of one container in order.
///
/// Returns the crash that ended processing early, if any.
async fn process_container(
    id: usize,
    ctx: &PoolContext,
    session: &mut dyn CompilerService,
    job: &ImportJob,
) -> Option<Crash> {
    let key = &job.container;
    let container = key.file_name();

    if ctx.config.is_reserved(key) {
        substitute_reserved(ctx, job).await;
        return None;
    }

    let dir = job.source_dir.clone();
    let sidecar_ext = ctx.config.sidecar_extension.clone();
    let planned = blocking(move || {
        plan_sources(&dir, &sidecar_ext).map_err(|e| ObjectError::new(ErrorKind::Source, e.to_string()))
    })
    .await;
    let plan = match planned {
        Ok(plan) => plan,
        Err(e) => {
            warn!(%container, error = %e, "cannot read source directory");
            ctx.state.record_container_error(key, e);
            return None;
        }
    };
    debug!(worker = id, %container, sources = plan.len(), "importing container");

    for (i, source) in plan.iter().enumerate() {
        let file = source.file_name();
        if ctx.state.is_succeeded(key, &file) {
            continue;
        }

        match import_object(ctx, session, job, source).await {
            Ok(()) => {
                debug!(worker = id, %container, %file, "imported");
                ctx.state.mark_success(key, &file);
            }
            Err(err) if err.is_transport() => {
                let message = err.message.clone();
                ctx.state.mark_failure(key, &file, err);

                let unattempted = plan[i + 1..]
                    .iter()
                    .filter(|s| !ctx.state.is_succeeded(key, &s.file_name()))
                    .count();
                if unattempted > 0 {
                    ctx.state.record_container_error(
                        key,
                        ObjectError::new(
                            ErrorKind::Incomplete,
                            format!("{unattempted} objects not attempted after worker {id} stopped at {file}"),
                        ),
                    );
                }
                return Some(Crash {
                    object: format!("{container}/{file}"),
                    message,
                });
            }
            Err(err) => {
                if err.kind == ErrorKind::Compile {
                    debug!(%container, %file, error = %err, "compilation failed");
                } else {
                    warn!(%container, %file, error = %err, "import failed");
                }
                ctx.state.mark_failure(key, &file, err);
            }
        }
    }
    None
}

/// Import one source file, followed by its binary section when it has a
/// sidecar.
async fn import_object(
    ctx: &PoolContext,
    session: &mut dyn CompilerService,
    job: &ImportJob,
    source: &PlannedSource,
) -> Result<(), ObjectError> {
    let timeout = ctx.config.call_timeout();
    let object = ObjectName::from_source_path(&source.path)
        .map_err(|e| ObjectError::new(ErrorKind::Source, e.to_string()))?;

    // A corrupt sidecar fails the object before anything is sent.
    let path = source.path.clone();
    let sidecar = source.sidecar.clone();
    let (section, text) = blocking(move || {
        let section = match &sidecar {
            Some(sidecar) => Some(BinarySection::from_file(sidecar)?.render()),
            None => None,
        };
        Ok((section, read_source(&path)?))
    })
    .await?;

    let source_result = call(
        timeout,
        session.set_object_source(&ctx.target, &job.container, &object, &text),
    )
    .await
    .map_err(ObjectError::from);

    let Some(section) = section else {
        return source_result;
    };
    if let Err(e) = &source_result {
        if e.is_transport() {
            return source_result;
        }
    }

    let binary_result = call(
        timeout,
        session.set_object_binary(&ctx.target, &job.container, &object, section.as_bytes()),
    )
    .await
    .map_err(ObjectError::from);

    match (source_result, binary_result) {
        (source_result, Ok(())) => source_result,
        (Ok(()), Err(bin)) => Err(ObjectError::new(bin.kind, format!("binary section: {}", bin.message))),
        (Err(src), Err(bin)) => {
            let kind = if bin.is_transport() { ErrorKind::Transport } else { src.kind };
            Err(ObjectError::new(
                kind,
                format!("binary section: {}; source: {}", bin.message, src.message),
            ))
        }
    }
}

/// Run filesystem reads off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ObjectError>
where
    F: FnOnce() -> Result<T, ObjectError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(ObjectError::new(ErrorKind::Source, format!("reader task failed: {e}"))),
    }
}

async fn substitute_reserved(ctx: &PoolContext, job: &ImportJob) {
    let container = job.container.file_name();
    let result = match ctx.resources.fetch(&container) {
        Ok(blob) => write_container(job.container.as_path(), &blob).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => info!(%container, "substituted reserved container from resource"),
        Err(e) => {
            warn!(%container, error = %e, "reserved container substitution failed");
            ctx.state
                .record_container_error(&job.container, ObjectError::new(ErrorKind::Resource, e.to_string()));
        }
    }
}

async fn write_container(path: &Path, blob: &[u8]) -> OrcaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, blob).await?;
    Ok(())
}

/// Run a service call under the per-call timeout.
async fn call<T, F>(timeout: Duration, fut: F) -> OrcaResult<T>
where
    F: Future<Output = OrcaResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(OrcaError::Timeout(timeout)),
    }
}
