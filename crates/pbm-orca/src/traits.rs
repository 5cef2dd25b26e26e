use std::path::Path;

use async_trait::async_trait;
use pbm_types::{ContainerPath, ObjectDescriptor, ObjectName};

use crate::error::OrcaResult;

/// One session with the compiler service.
///
/// A session is owned by exactly one worker: every method takes `&mut self`
/// because the service does not handle concurrent requests on one
/// connection. After a transport error the session must be dropped.
#[async_trait]
pub trait CompilerService: Send {
    /// List the objects stored in a container.
    async fn object_list(&mut self, container: &ContainerPath) -> OrcaResult<Vec<ObjectDescriptor>>;

    /// Compile and store an object's source text.
    ///
    /// `target` is the build target the object is compiled against.
    async fn set_object_source(
        &mut self,
        target: &Path,
        container: &ContainerPath,
        object: &ObjectName,
        source: &str,
    ) -> OrcaResult<()>;

    /// Attach a binary section to an object whose source was just set.
    async fn set_object_binary(
        &mut self,
        target: &Path,
        container: &ContainerPath,
        object: &ObjectName,
        section: &[u8],
    ) -> OrcaResult<()>;

    /// Read back an object's source text.
    async fn object_source(&mut self, container: &ContainerPath, object: &ObjectName) -> OrcaResult<String>;

    /// End the session.
    async fn close(&mut self) -> OrcaResult<()>;
}

/// Opens independent sessions, one per worker.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, worker: usize) -> OrcaResult<Box<dyn CompilerService>>;
}
