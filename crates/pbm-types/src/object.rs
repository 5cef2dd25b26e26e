use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::kind::SourceKind;

/// Name of one object inside a container (`w_main`, `d_customer_list`, ...).
///
/// The name is the stem of the exported source file; it carries no extension.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName(String);

impl ObjectName {
    /// Create a name, rejecting empty names and names containing path
    /// separators.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(TypeError::InvalidObjectName(name));
        }
        Ok(Self(name))
    }

    /// Derive the object name from a source file path (`src/w_main.srw` -> `w_main`).
    pub fn from_source_path(path: &Path) -> Result<Self, TypeError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TypeError::NoFileName(path.display().to_string()))?;
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.0)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An object as listed by the compiler service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub name: ObjectName,
    /// `None` when the service reports a type this workspace does not know.
    pub kind: Option<SourceKind>,
    /// Free-form comment stored with the object.
    pub comment: String,
    /// Size of the compiled object in bytes.
    pub size: u64,
}

impl ObjectDescriptor {
    pub fn new(name: ObjectName, kind: Option<SourceKind>) -> Self {
        Self {
            name,
            kind,
            comment: String::new(),
            size: 0,
        }
    }

    /// File name the object's source is exported under (`w_main.srw`).
    pub fn source_file_name(&self) -> Option<String> {
        self.kind
            .map(|k| format!("{}.{}", self.name, k.extension()))
    }
}
