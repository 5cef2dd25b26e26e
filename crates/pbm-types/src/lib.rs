//! Foundation types for pbmanager.
//!
//! This crate provides the vocabulary shared by every other `pbm-*` crate.
//!
//! # Key Types
//!
//! - [`ContainerPath`]: A compiled library file that receives imported objects
//! - [`ObjectName`]: The name of one object inside a container
//! - [`SourceKind`]: Object type derived from a source file's extension
//! - [`ImportJob`]: A container paired with the directory holding its sources
//! - [`ObjectDescriptor`]: An object as reported by the compiler service

pub mod container;
pub mod error;
pub mod kind;
pub mod object;

pub use container::{ContainerPath, ImportJob};
pub use error::TypeError;
pub use kind::SourceKind;
pub use object::{ObjectDescriptor, ObjectName};
