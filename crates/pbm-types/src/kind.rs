use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Object type, derived from the extension of its exported source file.
///
/// The declaration order of the variants is the import order: objects that
/// are referenced by many others (structures, queries, global functions) come
/// first, while windows, DataWindows and the application object come last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Structure,
    Query,
    Function,
    Pipeline,
    UserObject,
    Menu,
    Project,
    DataWindow,
    Window,
    Application,
}

impl SourceKind {
    /// All kinds in import order.
    pub const ALL: [SourceKind; 10] = [
        Self::Structure,
        Self::Query,
        Self::Function,
        Self::Pipeline,
        Self::UserObject,
        Self::Menu,
        Self::Project,
        Self::DataWindow,
        Self::Window,
        Self::Application,
    ];

    /// File extension (without the dot) used for this kind's exported source.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Structure => "srs",
            Self::Query => "srq",
            Self::Function => "srf",
            Self::Pipeline => "srp",
            Self::UserObject => "sru",
            Self::Menu => "srm",
            Self::Project => "srj",
            Self::DataWindow => "srd",
            Self::Window => "srw",
            Self::Application => "sra",
        }
    }

    /// Look up a kind by extension. Matching is case-insensitive and a
    /// leading dot is ignored.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }

    /// Look up a kind from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Position in the import order (0 = imported first).
    pub fn import_rank(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structure => "structure",
            Self::Query => "query",
            Self::Function => "function",
            Self::Pipeline => "pipeline",
            Self::UserObject => "userobject",
            Self::Menu => "menu",
            Self::Project => "project",
            Self::DataWindow => "datawindow",
            Self::Window => "window",
            Self::Application => "application",
        };
        f.write_str(name)
    }
}

impl FromStr for SourceKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_roundtrip_all_kinds() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::from_extension(kind.extension()), Some(kind));
        }
    }

    #[test]
    fn from_extension_ignores_case_and_dot() {
        assert_eq!(SourceKind::from_extension(".SRW"), Some(SourceKind::Window));
        assert_eq!(SourceKind::from_extension("Srs"), Some(SourceKind::Structure));
    }

    #[test]
    fn unknown_extension() {
        assert!(SourceKind::from_extension("bin").is_none());
        assert!(SourceKind::from_extension("").is_none());
        assert!("txt".parse::<SourceKind>().is_err());
    }

    #[test]
    fn from_path_uses_extension() {
        let kind = SourceKind::from_path(Path::new("src/exf1/w_main.srw"));
        assert_eq!(kind, Some(SourceKind::Window));
        assert!(SourceKind::from_path(Path::new("src/exf1/w_main")).is_none());
    }

    #[test]
    fn structures_before_windows_before_application() {
        assert!(SourceKind::Structure.import_rank() < SourceKind::Query.import_rank());
        assert!(SourceKind::Query.import_rank() < SourceKind::Window.import_rank());
        assert!(SourceKind::DataWindow.import_rank() < SourceKind::Application.import_rank());
        assert_eq!(SourceKind::Application.import_rank(), SourceKind::ALL.len() - 1);
    }
}
