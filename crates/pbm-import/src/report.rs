use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use pbm_binsec::BinsecError;
use pbm_orca::OrcaError;
use serde::Serialize;

/// Category of a per-object failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The source did not compile yet; expected while references are missing.
    Compile,
    /// The sidecar does not have the expected block layout.
    Structural,
    /// The compiler service connection failed or timed out.
    Transport,
    /// The source file or source directory could not be read.
    Source,
    /// A substitution resource was missing or could not be written.
    Resource,
    /// Objects left unattempted after the worker processing them stopped.
    Incomplete,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Compile => "compile",
            Self::Structural => "structural",
            Self::Transport => "transport",
            Self::Source => "source",
            Self::Resource => "resource",
            Self::Incomplete => "incomplete",
        };
        f.write_str(s)
    }
}

/// The most recent failure recorded for one object or container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ObjectError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl From<OrcaError> for ObjectError {
    fn from(e: OrcaError) -> Self {
        let kind = match &e {
            OrcaError::Connection(_) | OrcaError::Timeout(_) => ErrorKind::Transport,
            OrcaError::CompilationFailed { .. } | OrcaError::ObjectNotFound { .. } => ErrorKind::Compile,
            OrcaError::InvalidEncoding { .. } | OrcaError::Io(_) => ErrorKind::Source,
            OrcaError::ResourceNotFound(_) => ErrorKind::Resource,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<BinsecError> for ObjectError {
    fn from(e: BinsecError) -> Self {
        let kind = if e.is_structural() {
            ErrorKind::Structural
        } else {
            ErrorKind::Source
        };
        Self::new(kind, e.to_string())
    }
}

/// Errors still present when a run gave up, keyed by
/// `<container>/<object file>` or `<container>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorReport {
    pub errors: BTreeMap<String, ObjectError>,
}

impl ErrorReport {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ObjectError> {
        self.errors.get(key)
    }

    /// Number of recorded errors of the given kind.
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.errors.values().filter(|e| e.kind == kind).count()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, err) in &self.errors {
            writeln!(f, "{key}: {err}")?;
        }
        Ok(())
    }
}

/// Outcome of one pass over all containers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IterationReport {
    pub iteration: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

/// Summary of a successful run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub iterations: Vec<IterationReport>,
    pub total_elapsed: Duration,
}

impl ImportReport {
    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orca_errors_are_classified() {
        let compile: ObjectError = OrcaError::CompilationFailed {
            object: "w_main".into(),
            message: "undefined".into(),
        }
        .into();
        assert_eq!(compile.kind, ErrorKind::Compile);

        let transport: ObjectError = OrcaError::Timeout(Duration::from_secs(1)).into();
        assert!(transport.is_transport());

        let resource: ObjectError = OrcaError::ResourceNotFound("pbdom.pbl".into()).into();
        assert_eq!(resource.kind, ErrorKind::Resource);
    }

    #[test]
    fn binsec_errors_are_structural_unless_io() {
        let structural: ObjectError = BinsecError::BlockTooLong {
            offset: 0,
            declared: 503,
        }
        .into();
        assert_eq!(structural.kind, ErrorKind::Structural);

        let io: ObjectError = BinsecError::Io(std::io::Error::other("gone")).into();
        assert_eq!(io.kind, ErrorKind::Source);
    }

    #[test]
    fn report_serializes_as_map() {
        let mut report = ErrorReport::default();
        report.errors.insert(
            "a.pbl/w_main.srw".into(),
            ObjectError::new(ErrorKind::Compile, "Compilation failed"),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["a.pbl/w_main.srw"]["kind"], "compile");
        assert_eq!(report.count_kind(ErrorKind::Compile), 1);
        assert_eq!(report.to_string(), "a.pbl/w_main.srw: [compile] Compilation failed\n");
    }
}
