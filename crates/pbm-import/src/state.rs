//! Bookkeeping shared between the scheduler and its workers.
//!
//! All mutation goes through one mutex. Workers only touch the keys of the
//! container they are processing; the scheduler reads aggregates after every
//! worker of the iteration has finished. Containers are keyed by their full
//! path, so two libraries with the same file name never share state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use pbm_types::ContainerPath;

use crate::config::StagnationReset;
use crate::report::{ErrorReport, ObjectError};

#[derive(Default)]
struct Tables {
    /// Object files imported without error, per container. Kept across
    /// iterations of one run.
    succeeded: HashMap<ContainerPath, HashSet<String>>,
    /// Errors of the current iteration, keyed by (container, object file).
    errors: BTreeMap<(ContainerPath, Option<String>), ObjectError>,
    /// Error count per container as of the last iteration that processed it.
    last_container_errors: HashMap<ContainerPath, usize>,
}

/// Per-run import state.
#[derive(Default)]
pub struct RunState {
    tables: Mutex<Tables>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the previous iteration's error records.
    pub fn begin_iteration(&self) {
        self.tables.lock().expect("lock poisoned").errors.clear();
    }

    /// Close the iteration: store per-container error counts for the
    /// containers that were processed and return the total error count.
    pub fn finish_iteration<'a, I>(&self, processed: I) -> usize
    where
        I: IntoIterator<Item = &'a ContainerPath>,
    {
        let mut tables = self.tables.lock().expect("lock poisoned");
        for container in processed {
            let count = tables
                .errors
                .keys()
                .filter(|(c, _)| c == container)
                .count();
            tables
                .last_container_errors
                .insert(container.clone(), count);
        }
        tables.errors.len()
    }

    pub fn is_succeeded(&self, container: &ContainerPath, file: &str) -> bool {
        self.tables
            .lock()
            .expect("lock poisoned")
            .succeeded
            .get(container)
            .is_some_and(|files| files.contains(file))
    }

    pub fn mark_success(&self, container: &ContainerPath, file: &str) {
        let mut tables = self.tables.lock().expect("lock poisoned");
        tables
            .errors
            .remove(&(container.clone(), Some(file.to_string())));
        tables
            .succeeded
            .entry(container.clone())
            .or_default()
            .insert(file.to_string());
    }

    /// Record the latest failure of one object, clearing its success flag.
    pub fn mark_failure(&self, container: &ContainerPath, file: &str, error: ObjectError) {
        let mut tables = self.tables.lock().expect("lock poisoned");
        if let Some(files) = tables.succeeded.get_mut(container) {
            files.remove(file);
        }
        tables
            .errors
            .insert((container.clone(), Some(file.to_string())), error);
    }

    /// Record a failure that concerns the container as a whole.
    pub fn record_container_error(&self, container: &ContainerPath, error: ObjectError) {
        self.tables
            .lock()
            .expect("lock poisoned")
            .errors
            .insert((container.clone(), None), error);
    }

    pub fn success_count(&self, container: &ContainerPath) -> usize {
        self.tables
            .lock()
            .expect("lock poisoned")
            .succeeded
            .get(container)
            .map_or(0, HashSet::len)
    }

    /// Errors recorded for `container` in the current iteration.
    pub fn error_count(&self, container: &ContainerPath) -> usize {
        self.tables
            .lock()
            .expect("lock poisoned")
            .errors
            .keys()
            .filter(|(c, _)| c == container)
            .count()
    }

    /// Error count of the last iteration that processed `container`, or
    /// `None` if it has not been processed in this run.
    pub fn last_error_count(&self, container: &ContainerPath) -> Option<usize> {
        self.tables
            .lock()
            .expect("lock poisoned")
            .last_container_errors
            .get(container)
            .copied()
    }

    /// Reset success flags of a stagnating container.
    pub fn reset(&self, container: &ContainerPath, policy: StagnationReset) {
        match policy {
            StagnationReset::All => {
                self.tables
                    .lock()
                    .expect("lock poisoned")
                    .succeeded
                    .remove(container);
            }
            // Failed objects already lost their flag in `mark_failure`.
            StagnationReset::FailedOnly => {}
        }
    }

    /// Snapshot of the current iteration's errors.
    ///
    /// Keys use the container's file name, or its full path when another
    /// container in the report has the same file name.
    pub fn error_report(&self) -> ErrorReport {
        let tables = self.tables.lock().expect("lock poisoned");
        let containers: HashSet<&ContainerPath> = tables.errors.keys().map(|(c, _)| c).collect();
        let mut name_uses: HashMap<String, usize> = HashMap::new();
        for container in &containers {
            *name_uses.entry(container.file_name()).or_default() += 1;
        }
        let label = |container: &ContainerPath| {
            let name = container.file_name();
            if name_uses.get(&name).copied().unwrap_or(0) > 1 {
                container.to_string()
            } else {
                name
            }
        };

        let errors = tables
            .errors
            .iter()
            .map(|((container, file), err)| {
                let key = match file {
                    Some(file) => format!("{}/{file}", label(container)),
                    None => label(container),
                };
                (key, err.clone())
            })
            .collect();
        ErrorReport { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ErrorKind;

    fn lib(path: &str) -> ContainerPath {
        ContainerPath::new(path).unwrap()
    }

    fn compile_error() -> ObjectError {
        ObjectError::new(ErrorKind::Compile, "Compilation failed")
    }

    #[test]
    fn success_and_failure_flags() {
        let state = RunState::new();
        let a = lib("a.pbl");
        state.mark_success(&a, "w_main.srw");
        assert!(state.is_succeeded(&a, "w_main.srw"));
        assert!(!state.is_succeeded(&lib("b.pbl"), "w_main.srw"));

        state.mark_failure(&a, "w_main.srw", compile_error());
        assert!(!state.is_succeeded(&a, "w_main.srw"));
        assert_eq!(state.error_count(&a), 1);
        assert_eq!(state.success_count(&a), 0);
    }

    #[test]
    fn same_file_name_in_different_directories_is_separate() {
        let state = RunState::new();
        let (x, y) = (lib("x/common.pbl"), lib("y/common.pbl"));
        state.mark_success(&x, "u_shared.sru");
        assert!(!state.is_succeeded(&y, "u_shared.sru"));

        state.mark_failure(&y, "u_shared.sru", compile_error());
        assert!(state.is_succeeded(&x, "u_shared.sru"));
        assert_eq!(state.error_count(&x), 0);
        assert_eq!(state.error_count(&y), 1);
    }

    #[test]
    fn errors_replaced_not_accumulated() {
        let state = RunState::new();
        let a = lib("a.pbl");
        state.mark_failure(&a, "x.srw", compile_error());
        state.mark_failure(&a, "x.srw", ObjectError::new(ErrorKind::Transport, "reset"));
        assert_eq!(state.error_count(&a), 1);
        assert_eq!(state.error_report().get("a.pbl/x.srw").unwrap().kind, ErrorKind::Transport);

        state.begin_iteration();
        assert_eq!(state.error_count(&a), 0);
        assert!(state.error_report().is_empty());
    }

    #[test]
    fn finish_iteration_tracks_processed_containers_only() {
        let state = RunState::new();
        let (a, b) = (lib("a.pbl"), lib("b.pbl"));
        state.mark_failure(&a, "x.srw", compile_error());
        state.record_container_error(&a, ObjectError::new(ErrorKind::Incomplete, "2 left"));
        state.mark_success(&b, "y.srw");

        assert_eq!(state.finish_iteration([&a, &b]), 2);
        assert_eq!(state.last_error_count(&a), Some(2));
        assert_eq!(state.last_error_count(&b), Some(0));
        assert_eq!(state.last_error_count(&lib("c.pbl")), None);

        state.begin_iteration();
        assert_eq!(state.finish_iteration([&a]), 0);
        assert_eq!(state.last_error_count(&a), Some(0));
        assert_eq!(state.last_error_count(&b), Some(0));
    }

    #[test]
    fn report_keys() {
        let state = RunState::new();
        state.mark_failure(&lib("lib/a.pbl"), "x.srw", compile_error());
        state.record_container_error(&lib("lib/pbdom.pbl"), ObjectError::new(ErrorKind::Resource, "missing"));
        let report = state.error_report();
        let keys: Vec<&String> = report.errors.keys().collect();
        assert_eq!(keys, ["a.pbl/x.srw", "pbdom.pbl"]);
    }

    #[test]
    fn report_keys_fall_back_to_paths_on_name_clash() {
        let state = RunState::new();
        state.mark_failure(&lib("x/common.pbl"), "u.sru", compile_error());
        state.mark_failure(&lib("y/common.pbl"), "u.sru", compile_error());
        let report = state.error_report();
        assert_eq!(report.len(), 2);
        assert!(report.get("x/common.pbl/u.sru").is_some());
        assert!(report.get("y/common.pbl/u.sru").is_some());
    }

    #[test]
    fn reset_all_clears_every_flag() {
        let state = RunState::new();
        let a = lib("a.pbl");
        state.mark_success(&a, "ok.srw");
        state.mark_failure(&a, "bad.srw", compile_error());
        state.reset(&a, StagnationReset::All);
        assert_eq!(state.success_count(&a), 0);
    }

    #[test]
    fn reset_failed_only_keeps_successes() {
        let state = RunState::new();
        let a = lib("a.pbl");
        state.mark_success(&a, "ok.srw");
        state.mark_failure(&a, "bad.srw", compile_error());
        state.reset(&a, StagnationReset::FailedOnly);
        assert!(state.is_succeeded(&a, "ok.srw"));
        assert!(!state.is_succeeded(&a, "bad.srw"));
        assert_eq!(state.success_count(&a), 1);
    }
}
