//! Compiler service adapter for pbmanager.
//!
//! The compiler service compiles object sources into library containers. It
//! is an external process reached over a connection that cannot serve
//! concurrent requests, so every worker opens its own session through a
//! [`Connector`].
//!
//! # Key Types
//!
//! - [`CompilerService`]: one session (object list, set source, set binary)
//! - [`Connector`]: opens a session per worker
//! - [`OrcaError`]: compile failures vs. transport failures
//! - [`read_source`]: loads an exported source file as compiler input
//! - [`ResourceProvider`]: known-good blobs for containers that are
//!   substituted instead of rebuilt
//! - [`MemoryCatalog`]: in-memory compiler for tests and dry runs

pub mod error;
pub mod memory;
pub mod resource;
pub mod source;
pub mod traits;

pub use error::{OrcaError, OrcaResult};
pub use memory::{MemoryCatalog, MemoryConnector, MemorySession};
pub use resource::{DirResourceProvider, MemoryResourceProvider, ResourceProvider};
pub use source::{read_source, EXPORT_HEADER};
pub use traits::{CompilerService, Connector};
