//! In-memory compiler service.
//!
//! Models the behavior the import scheduler depends on:
//!
//! - submitted source is stored in the container even when it does not
//!   compile, so it is known to every session opened afterwards
//! - an object compiles only when all its declared dependencies are visible
//!   to the session, i.e. were known when the session connected or compiled
//!   successfully within it
//! - transport faults and latency can be scripted per object

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use pbm_types::{ContainerPath, ObjectDescriptor, ObjectName, SourceKind};
use tracing::debug;

use crate::error::{OrcaError, OrcaResult};
use crate::source::EXPORT_HEADER;
use crate::traits::{CompilerService, Connector};

#[derive(Clone, Debug)]
struct StoredObject {
    kind: Option<SourceKind>,
    source: String,
    binary: Option<Vec<u8>>,
    compiled: bool,
}

#[derive(Default)]
struct CatalogState {
    containers: BTreeMap<ContainerPath, BTreeMap<ObjectName, StoredObject>>,
    dependencies: HashMap<ObjectName, Vec<ObjectName>>,
    /// Remaining number of transport failures per object.
    faults: HashMap<ObjectName, usize>,
    latency: Duration,
    connections: usize,
    /// Every `set_object_source` call, in arrival order.
    source_log: Vec<(ContainerPath, ObjectName)>,
}

impl CatalogState {
    fn known_objects(&self) -> HashSet<ObjectName> {
        self.containers
            .values()
            .flat_map(|objects| objects.keys().cloned())
            .collect()
    }

    fn take_fault(&mut self, object: &ObjectName) -> bool {
        match self.faults.get_mut(object) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Shared state of the in-memory compiler: every container and object,
/// declared dependencies and scripted faults.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `object` only compiles once `depends_on` are visible.
    pub fn declare_dependencies<I, N>(&self, object: &str, depends_on: I)
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let Ok(object) = ObjectName::new(object) else {
            return;
        };
        let deps = depends_on
            .into_iter()
            .filter_map(|d| ObjectName::new(d.as_ref()).ok())
            .collect();
        self.state
            .write()
            .expect("lock poisoned")
            .dependencies
            .insert(object, deps);
    }

    /// Make the next `times` calls touching `object` fail with a
    /// connection error.
    pub fn fail_transport_on(&self, object: &str, times: usize) {
        if let Ok(object) = ObjectName::new(object) {
            self.state
                .write()
                .expect("lock poisoned")
                .faults
                .insert(object, times);
        }
    }

    /// Delay every service call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().expect("lock poisoned").latency = latency;
    }

    /// Number of sessions opened so far.
    pub fn connection_count(&self) -> usize {
        self.state.read().expect("lock poisoned").connections
    }

    /// Number of `set_object_source` calls received so far.
    pub fn source_call_count(&self) -> usize {
        self.state.read().expect("lock poisoned").source_log.len()
    }

    /// `(container, object)` of every `set_object_source` call, oldest first.
    pub fn source_calls(&self) -> Vec<(ContainerPath, ObjectName)> {
        self.state.read().expect("lock poisoned").source_log.clone()
    }

    /// Whether `object` is stored in `container`, compiled or not.
    pub fn contains(&self, container: &ContainerPath, object: &str) -> bool {
        self.with_object(container, object, |_| ()).is_some()
    }

    /// Whether the last source submitted for `object` compiled.
    pub fn is_compiled(&self, container: &ContainerPath, object: &str) -> bool {
        self.with_object(container, object, |o| o.compiled)
            .unwrap_or(false)
    }

    /// Binary section attached to `object`, if any.
    pub fn binary(&self, container: &ContainerPath, object: &str) -> Option<Vec<u8>> {
        self.with_object(container, object, |o| o.binary.clone())
            .flatten()
    }

    /// Number of objects stored in `container`.
    pub fn object_count(&self, container: &ContainerPath) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .containers
            .get(container)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            catalog: self.clone(),
        }
    }

    fn with_object<T>(
        &self,
        container: &ContainerPath,
        object: &str,
        f: impl FnOnce(&StoredObject) -> T,
    ) -> Option<T> {
        let name = ObjectName::new(object).ok()?;
        let state = self.state.read().expect("lock poisoned");
        state.containers.get(container)?.get(&name).map(f)
    }

    fn latency(&self) -> Duration {
        self.state.read().expect("lock poisoned").latency
    }
}

/// Opens [`MemorySession`]s against a [`MemoryCatalog`].
#[derive(Clone)]
pub struct MemoryConnector {
    catalog: MemoryCatalog,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, worker: usize) -> OrcaResult<Box<dyn CompilerService>> {
        let visible = {
            let mut state = self.catalog.state.write().expect("lock poisoned");
            state.connections += 1;
            state.known_objects()
        };
        debug!(worker, known = visible.len(), "memory session opened");
        Ok(Box::new(MemorySession {
            worker,
            catalog: self.catalog.clone(),
            visible,
            closed: false,
        }))
    }
}

/// One session with the in-memory compiler.
pub struct MemorySession {
    worker: usize,
    catalog: MemoryCatalog,
    visible: HashSet<ObjectName>,
    closed: bool,
}

impl MemorySession {
    /// Wait out the configured latency, then reject calls on a closed
    /// session or one hit by a scripted fault.
    async fn begin_call(&mut self, object: Option<&ObjectName>) -> OrcaResult<()> {
        let latency = self.catalog.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.closed {
            return Err(OrcaError::Connection(format!("session {} is closed", self.worker)));
        }
        if let Some(object) = object {
            let faulted = self.catalog.state.write().expect("lock poisoned").take_fault(object);
            if faulted {
                self.closed = true;
                return Err(OrcaError::Connection(format!(
                    "connection reset while processing {object}"
                )));
            }
        }
        Ok(())
    }
}

fn header_kind(source: &str) -> Option<SourceKind> {
    let first_line = source.lines().next()?;
    let file_name = first_line.strip_prefix(EXPORT_HEADER)?;
    SourceKind::from_path(Path::new(file_name.trim()))
}

#[async_trait]
impl CompilerService for MemorySession {
    async fn object_list(&mut self, container: &ContainerPath) -> OrcaResult<Vec<ObjectDescriptor>> {
        self.begin_call(None).await?;
        let state = self.catalog.state.read().expect("lock poisoned");
        let list = state
            .containers
            .get(container)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(name, obj)| ObjectDescriptor {
                        name: name.clone(),
                        kind: obj.kind,
                        comment: String::new(),
                        size: obj.source.len() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(list)
    }

    async fn set_object_source(
        &mut self,
        _target: &Path,
        container: &ContainerPath,
        object: &ObjectName,
        source: &str,
    ) -> OrcaResult<()> {
        self.begin_call(Some(object)).await?;

        let mut state = self.catalog.state.write().expect("lock poisoned");
        state.source_log.push((container.clone(), object.clone()));
        let missing: Vec<String> = state
            .dependencies
            .get(object)
            .map(|deps| {
                deps.iter()
                    .filter(|d| !self.visible.contains(*d))
                    .map(|d| d.to_string())
                    .collect()
            })
            .unwrap_or_default();
        let compiled = missing.is_empty();

        state.containers.entry(container.clone()).or_default().insert(
            object.clone(),
            StoredObject {
                kind: header_kind(source),
                source: source.to_string(),
                binary: None,
                compiled,
            },
        );
        drop(state);

        if compiled {
            self.visible.insert(object.clone());
            debug!(worker = self.worker, %container, %object, "compiled");
            Ok(())
        } else {
            Err(OrcaError::CompilationFailed {
                object: object.to_string(),
                message: format!("undefined reference to {}", missing.join(", ")),
            })
        }
    }

    async fn set_object_binary(
        &mut self,
        _target: &Path,
        container: &ContainerPath,
        object: &ObjectName,
        section: &[u8],
    ) -> OrcaResult<()> {
        self.begin_call(Some(object)).await?;

        let mut state = self.catalog.state.write().expect("lock poisoned");
        let stored = state
            .containers
            .get_mut(container)
            .and_then(|objects| objects.get_mut(object))
            .ok_or_else(|| OrcaError::ObjectNotFound {
                container: container.to_string(),
                object: object.to_string(),
            })?;
        stored.binary = Some(section.to_vec());
        Ok(())
    }

    async fn object_source(&mut self, container: &ContainerPath, object: &ObjectName) -> OrcaResult<String> {
        self.begin_call(None).await?;
        let state = self.catalog.state.read().expect("lock poisoned");
        state
            .containers
            .get(container)
            .and_then(|objects| objects.get(object))
            .map(|o| o.source.clone())
            .ok_or_else(|| OrcaError::ObjectNotFound {
                container: container.to_string(),
                object: object.to_string(),
            })
    }

    async fn close(&mut self) -> OrcaResult<()> {
        self.closed = true;
        debug!(worker = self.worker, "memory session closed");
        Ok(())
    }
}
