//! Bulk ingest: extracted records → graph.
//!
//! Runs in two phases. The structural phase writes every file's classes,
//! methods and DECLARES edges; the resolution phase then rebuilds the
//! outgoing CALLS edges of every affected method, so a call into a method
//! declared later in the same batch still resolves.
//!
//! Records that share a method identity within one batch (overloads, or a
//! partial class declaring the method in several files) are written with
//! the union of their raw calls.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CallGraphError, Result};
use crate::graph::backend::GraphBackend;
use crate::graph::resolver::{call_target_name, CallResolver};
use crate::types::{CallKind, ClassRecord, Language, NodeId, RecordSet};

/// Knobs for [`ingest`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Persist method source text.
    pub keep_definitions: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            keep_definitions: true,
        }
    }
}

/// One file whose records could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub file_path: String,
    pub reason: String,
}

/// Outcome of one [`ingest`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files_ingested: usize,
    pub classes: usize,
    pub methods: usize,
    /// Methods whose CALLS edges were rebuilt (batch methods plus callers
    /// elsewhere in the graph that call a name the batch declared).
    pub methods_resolved: usize,
    pub resolved_edges: usize,
    pub unresolved_edges: usize,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, file_path: &str, error: &CallGraphError) {
        warn!(file = file_path, error = %error, "skipping file");
        self.failures.push(IngestFailure {
            file_path: file_path.to_string(),
            reason: error.to_string(),
        });
    }
}

/// `(class, method)` → raw calls of every record with that identity, in
/// first-seen order without repeats.
type MergedCalls<'r> = HashMap<(&'r str, &'r str), Vec<String>>;

fn merge_calls<'r>(files: &[(Language, &'r str, &'r [ClassRecord])]) -> MergedCalls<'r> {
    let mut merged: MergedCalls<'r> = HashMap::new();
    for &(_, _, classes) in files {
        for class in classes {
            for method in &class.methods {
                let calls = merged
                    .entry((class.name.as_str(), method.name.as_str()))
                    .or_default();
                for call in &method.raw_calls {
                    if !calls.contains(call) {
                        calls.push(call.clone());
                    }
                }
            }
        }
    }
    merged
}

fn with_merged_calls(classes: &[ClassRecord], merged: &MergedCalls<'_>) -> Vec<ClassRecord> {
    classes
        .iter()
        .map(|class| {
            let mut class = class.clone();
            for method in &mut class.methods {
                if let Some(calls) = merged.get(&(class.name.as_str(), method.name.as_str())) {
                    method.raw_calls.clone_from(calls);
                }
            }
            class
        })
        .collect()
}

/// Merge `records` into `backend`.
///
/// Per-file problems (invalid records, a method whose parent class is
/// missing) are collected in the report and the batch continues. Store
/// failures abort the ingest and are returned as errors.
///
/// Calls are unioned across records of one method only within this batch;
/// a later batch overwrites the stored call list.
pub fn ingest(
    backend: &dyn GraphBackend,
    records: &RecordSet,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let mut touched: BTreeSet<NodeId> = BTreeSet::new();
    let mut declared_names: HashSet<String> = HashSet::new();

    info!(
        backend = backend.backend_name(),
        files = records.file_count(),
        "ingest: structural phase"
    );

    let mut valid = Vec::with_capacity(records.file_count());
    for (language, file_path, classes) in records.files() {
        match RecordSet::validate_file(file_path, classes) {
            Ok(()) => valid.push((language, file_path, classes)),
            Err(e) => report.fail(file_path, &e),
        }
    }
    let merged = merge_calls(&valid);

    for &(language, file_path, classes) in &valid {
        let classes = with_merged_calls(classes, &merged);
        match backend.write_file_structure(file_path, &classes, options.keep_definitions) {
            Ok(methods) => {
                debug!(%language, file = file_path, methods = methods.len(), "ingested file");
                report.files_ingested += 1;
                report.classes += classes.len();
                report.methods += methods.len();
                for m in methods {
                    touched.insert(m.id);
                    declared_names.insert(m.name);
                }
            }
            Err(e @ (CallGraphError::InvalidRecord { .. } | CallGraphError::Ingest { .. })) => {
                report.fail(file_path, &e);
            }
            Err(e) => return Err(e),
        }
    }

    // Callers outside the batch that name a method the batch declared need
    // their edges rebuilt too: an UNRESOLVED loop may now resolve, or a
    // resolved call may gain another candidate.
    if !declared_names.is_empty() {
        for method in backend.methods()? {
            if touched.contains(&method.id) {
                continue;
            }
            if method
                .raw_calls
                .iter()
                .any(|c| declared_names.contains(call_target_name(c)))
            {
                touched.insert(method.id);
            }
        }
    }

    info!(methods = touched.len(), "ingest: resolution phase");
    let resolver = CallResolver::new(backend);
    for id in touched {
        let Some(method) = backend.method(id)? else {
            continue;
        };
        let edges = resolver.resolve_all(&method)?;
        for edge in &edges {
            match edge.kind {
                CallKind::Resolved => report.resolved_edges += 1,
                CallKind::Unresolved => report.unresolved_edges += 1,
            }
        }
        backend.replace_calls_from(id, &edges)?;
        report.methods_resolved += 1;
    }

    info!(
        files = report.files_ingested,
        failures = report.failures.len(),
        resolved = report.resolved_edges,
        unresolved = report.unresolved_edges,
        "ingest complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryStore;
    use crate::graph::store::SqliteStore;
    use crate::types::{ClassRecord, Language, MethodRecord};
    use pretty_assertions::assert_eq;

    fn records(files: &[(&str, Vec<ClassRecord>)]) -> RecordSet {
        let mut set = RecordSet::new();
        for (path, classes) in files {
            set.insert(Language::CSharp, *path, classes.clone());
        }
        set
    }

    fn two_class_fixture() -> RecordSet {
        records(&[
            (
                "A.cs",
                vec![ClassRecord::new("ClassA")
                    .with_method(MethodRecord::new("M1").with_calls(["M2", "Ghost"]))],
            ),
            (
                "B.cs",
                vec![ClassRecord::new("ClassB").with_method(MethodRecord::new("M2"))],
            ),
        ])
    }

    fn backends() -> Vec<Box<dyn GraphBackend>> {
        vec![
            Box::new(MemoryStore::new()),
            Box::new(SqliteStore::in_memory().unwrap()),
        ]
    }

    #[test]
    fn call_to_later_declared_method_resolves() {
        for backend in backends() {
            let report = ingest(backend.as_ref(), &two_class_fixture(), &IngestOptions::default())
                .unwrap();
            assert!(report.is_clean());
            assert_eq!(report.files_ingested, 2);
            assert_eq!(report.resolved_edges, 1);
            assert_eq!(report.unresolved_edges, 1);

            let m1 = backend.find_method("ClassA", "M1").unwrap().unwrap();
            let m2 = backend.find_method("ClassB", "M2").unwrap().unwrap();
            let out = backend.outgoing_calls(m1.id).unwrap();
            assert!(out.iter().any(|e| e.target == m2.id && e.kind == CallKind::Resolved));
            assert!(out
                .iter()
                .any(|e| e.target == m1.id && e.kind == CallKind::Unresolved && e.call_name == "Ghost"));
        }
    }

    #[test]
    fn reingest_is_idempotent() {
        for backend in backends() {
            let input = two_class_fixture();
            ingest(backend.as_ref(), &input, &IngestOptions::default()).unwrap();
            let before = backend.counts().unwrap();
            ingest(backend.as_ref(), &input, &IngestOptions::default()).unwrap();
            assert_eq!(backend.counts().unwrap(), before);
        }
    }

    #[test]
    fn reingest_replaces_stale_edges() {
        for backend in backends() {
            ingest(backend.as_ref(), &two_class_fixture(), &IngestOptions::default()).unwrap();

            let changed = records(&[(
                "A.cs",
                vec![ClassRecord::new("ClassA").with_method(MethodRecord::new("M1"))],
            )]);
            ingest(backend.as_ref(), &changed, &IngestOptions::default()).unwrap();

            let m1 = backend.find_method("ClassA", "M1").unwrap().unwrap();
            assert!(backend.outgoing_calls(m1.id).unwrap().is_empty());
        }
    }

    #[test]
    fn later_batch_resolves_earlier_unresolved_call() {
        for backend in backends() {
            let first = records(&[(
                "A.cs",
                vec![ClassRecord::new("ClassA")
                    .with_method(MethodRecord::new("M1").with_calls(["svc.M2"]))],
            )]);
            ingest(backend.as_ref(), &first, &IngestOptions::default()).unwrap();
            assert_eq!(backend.counts().unwrap().unresolved_calls, 1);

            let second = records(&[(
                "B.cs",
                vec![ClassRecord::new("ClassB").with_method(MethodRecord::new("M2"))],
            )]);
            let report = ingest(backend.as_ref(), &second, &IngestOptions::default()).unwrap();
            assert_eq!(report.methods_resolved, 2);

            let counts = backend.counts().unwrap();
            assert_eq!(counts.unresolved_calls, 0);
            assert_eq!(counts.resolved_calls, 1);
        }
    }

    #[test]
    fn invalid_file_is_reported_and_batch_continues() {
        let backend = MemoryStore::new();
        let mut input = two_class_fixture();
        input.insert(
            Language::Java,
            "Broken.java",
            vec![ClassRecord::new("Broken").with_method(MethodRecord::new(""))],
        );
        let report = ingest(&backend, &input, &IngestOptions::default()).unwrap();
        assert_eq!(report.files_ingested, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_path, "Broken.java");
        assert!(backend.classes_named("Broken").unwrap().is_empty());
    }

    #[test]
    fn definitions_follow_options() {
        let backend = MemoryStore::new();
        let mut method = MethodRecord::new("Run");
        method.definition = Some("void Run() {}".into());
        let input = records(&[("A.cs", vec![ClassRecord::new("A").with_method(method)])]);

        ingest(&backend, &input, &IngestOptions { keep_definitions: false }).unwrap();
        let run = backend.find_method("A", "Run").unwrap().unwrap();
        assert_eq!(run.definition, None);

        ingest(&backend, &input, &IngestOptions::default()).unwrap();
        let run = backend.find_method("A", "Run").unwrap().unwrap();
        assert_eq!(run.definition.as_deref(), Some("void Run() {}"));
    }

    fn call_names(backend: &dyn GraphBackend, class: &str, method: &str) -> Vec<String> {
        let node = backend.find_method(class, method).unwrap().unwrap();
        let mut names: Vec<String> = backend
            .outgoing_calls(node.id)
            .unwrap()
            .into_iter()
            .map(|e| e.call_name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn overloads_keep_the_calls_of_every_body() {
        for backend in backends() {
            let input = records(&[(
                "Svc.cs",
                vec![ClassRecord::new("Svc")
                    .with_method(MethodRecord::new("Run").with_calls(["Alpha"]))
                    .with_method(MethodRecord::new("Run").with_calls(["Beta", "Alpha"]))],
            )]);
            let report = ingest(backend.as_ref(), &input, &IngestOptions::default()).unwrap();
            assert!(report.is_clean());
            assert_eq!(call_names(backend.as_ref(), "Svc", "Run"), vec!["Alpha", "Beta"]);

            let run = backend.find_method("Svc", "Run").unwrap().unwrap();
            assert_eq!(run.raw_calls, vec!["Alpha", "Beta"]);

            let before = backend.counts().unwrap();
            ingest(backend.as_ref(), &input, &IngestOptions::default()).unwrap();
            assert_eq!(backend.counts().unwrap(), before);
        }
    }

    #[test]
    fn partial_class_method_split_across_files_keeps_both_call_lists() {
        for backend in backends() {
            let input = records(&[
                (
                    "A.cs",
                    vec![ClassRecord::new("Order")
                        .with_method(MethodRecord::new("Total").with_calls(["Sum"]))],
                ),
                (
                    "B.cs",
                    vec![ClassRecord::new("Order")
                        .with_method(MethodRecord::new("Total").with_calls(["Tax"]))],
                ),
            ]);
            ingest(backend.as_ref(), &input, &IngestOptions::default()).unwrap();
            assert_eq!(call_names(backend.as_ref(), "Order", "Total"), vec!["Sum", "Tax"]);
        }
    }

    #[test]
    fn later_batch_overwrites_merged_calls() {
        for backend in backends() {
            let first = records(&[(
                "Svc.cs",
                vec![ClassRecord::new("Svc")
                    .with_method(MethodRecord::new("Run").with_calls(["Alpha"]))
                    .with_method(MethodRecord::new("Run").with_calls(["Beta"]))],
            )]);
            ingest(backend.as_ref(), &first, &IngestOptions::default()).unwrap();

            let second = records(&[(
                "Svc.cs",
                vec![ClassRecord::new("Svc")
                    .with_method(MethodRecord::new("Run").with_calls(["Gamma"]))],
            )]);
            ingest(backend.as_ref(), &second, &IngestOptions::default()).unwrap();
            assert_eq!(call_names(backend.as_ref(), "Svc", "Run"), vec!["Gamma"]);
        }
    }

    #[test]
    fn partial_class_across_files_shares_method_node() {
        let backend = SqliteStore::in_memory().unwrap();
        let input = records(&[
            (
                "Order.Part1.cs",
                vec![ClassRecord::new("Order").with_method(MethodRecord::new("Total"))],
            ),
            (
                "Order.Part2.cs",
                vec![ClassRecord::new("Order").with_method(MethodRecord::new("Total"))],
            ),
        ]);
        ingest(&backend, &input, &IngestOptions::default()).unwrap();
        let counts = backend.counts().unwrap();
        assert_eq!(counts.classes, 2);
        assert_eq!(counts.methods, 1);
        assert_eq!(counts.declares, 2);
    }
}
