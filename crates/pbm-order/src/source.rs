//! Import order of the exported sources belonging to one container.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pbm_types::SourceKind;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{OrderError, OrderResult};

/// Position of a file's extension in the import order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ExtensionRank {
    Known(usize),
    /// Unknown extensions sort after every known one, alphabetically.
    Unknown(String),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey<'a> {
    rank: ExtensionRank,
    /// `false` for "master" objects so they sort first.
    not_master: bool,
    file_name: String,
    path: &'a Path,
}

fn sort_key(path: &Path) -> SortKey<'_> {
    let rank = match SourceKind::from_path(path) {
        Some(kind) => ExtensionRank::Known(kind.import_rank()),
        None => ExtensionRank::Unknown(
            path.extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
        ),
    };
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    SortKey {
        rank,
        not_master: !stem.contains("master"),
        file_name,
        path,
    }
}

/// Compare two source paths by import order.
pub fn compare_sources(a: &Path, b: &Path) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Deduplicate and order source files for import.
///
/// Keys, in order: extension rank, "master" in the file stem, file name.
/// The full path breaks remaining ties so the result is a total order.
pub fn order_sources<I>(files: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let unique: BTreeSet<PathBuf> = files.into_iter().collect();
    let mut ordered: Vec<PathBuf> = unique.into_iter().collect();
    ordered.sort_by(|a, b| compare_sources(a, b));
    ordered
}

/// Recursively collect every regular file below `dir`.
pub fn collect_files(dir: &Path) -> OrderResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OrderError::SourceDirNotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// One source file scheduled for import, with its sidecar if present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedSource {
    pub path: PathBuf,
    pub sidecar: Option<PathBuf>,
}

impl PlannedSource {
    /// File name used as the error-record and success-flag key.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Collect and order the sources of a container directory.
///
/// Files with `sidecar_ext` are never imported on their own; a source gets
/// the sidecar at its own path with the extension replaced.
pub fn plan_sources(dir: &Path, sidecar_ext: &str) -> OrderResult<Vec<PlannedSource>> {
    let files = collect_files(dir)?;
    let is_sidecar = |p: &Path| {
        p.extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(sidecar_ext))
            .unwrap_or(false)
    };
    let sidecars: BTreeSet<PathBuf> = files.iter().filter(|p| is_sidecar(p)).cloned().collect();

    let planned: Vec<PlannedSource> = order_sources(files.into_iter().filter(|p| !is_sidecar(p)))
        .into_iter()
        .map(|path| {
            let candidate = path.with_extension(sidecar_ext);
            let sidecar = sidecars.contains(&candidate).then_some(candidate);
            PlannedSource { path, sidecar }
        })
        .collect();

    debug!(
        dir = %dir.display(),
        sources = planned.len(),
        sidecars = sidecars.len(),
        "planned container sources"
    );
    Ok(planned)
}
