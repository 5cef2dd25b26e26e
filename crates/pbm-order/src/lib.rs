//! Import ordering for pbmanager.
//!
//! - [`order_sources`] / [`plan_sources`]: the order in which one container's
//!   exported sources are imported
//! - [`LibraryOrder`]: build order of library containers
//! - [`Target`]: target descriptor listing libraries in build order

pub mod error;
pub mod library;
pub mod source;
pub mod target;

pub use error::{OrderError, OrderResult};
pub use library::{parse_name, LibraryOrder, STANDARD_PRIORITY_LISTS, UNLISTED_PRIORITY};
pub use source::{collect_files, compare_sources, order_sources, plan_sources, PlannedSource};
pub use target::Target;
