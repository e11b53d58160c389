//! Parse → extract → ingest, with parsing fanned out over a rayon pool.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CallGraphError, Result};
use crate::graph::backend::GraphBackend;
use crate::graph::ingest::{ingest, IngestOptions, IngestReport};
use crate::indexer::discover::candidate_files;
use crate::indexer::extractor::extract_file;
use crate::indexer::parser::CodeParser;
use crate::types::{Language, RecordSet};

/// Called once per file after it has been parsed (successfully or not).
pub type ProgressFn<'a> = &'a (dyn Fn(&Path) + Sync);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Parser threads. `0` lets rayon pick.
    pub workers: usize,
    /// Files in other languages are skipped.
    pub languages: Vec<Language>,
    pub ingest: IngestOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            languages: Language::ALL.to_vec(),
            ingest: IngestOptions::default(),
        }
    }
}

/// A file that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub path: String,
    pub reason: String,
}

/// Output of the parse phase.
#[derive(Debug, Default)]
pub struct ParseReport {
    pub records: RecordSet,
    pub files_parsed: usize,
    pub failures: Vec<ParseFailure>,
}

/// Combined outcome of [`Pipeline::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub files_parsed: usize,
    pub parse_failures: Vec<ParseFailure>,
    pub ingest: IngestReport,
    pub elapsed_ms: u128,
}

/// Store-relative file label: relative to `root` when possible, `/`-separated.
fn file_label(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

pub struct Pipeline<'a> {
    backend: &'a dyn GraphBackend,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(backend: &'a dyn GraphBackend, options: PipelineOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Parse every file in `files` in parallel. Failures are collected, never
    /// fatal. Record keys are paths relative to `root`.
    pub fn parse_files(
        &self,
        files: &[PathBuf],
        root: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<ParseReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|e| CallGraphError::Config(format!("thread pool: {e}")))?;

        let collected: Mutex<ParseReport> = Mutex::new(ParseReport::default());
        let languages = &self.options.languages;

        pool.install(|| {
            files.par_iter().for_each(|path| {
                let label = file_label(path, root);
                match CodeParser::detect_language(path) {
                    Some(language) if !languages.contains(&language) => {
                        debug!(file = %label, %language, "language disabled; skipped");
                    }
                    _ => {
                        let outcome = extract_file(path);
                        let mut report = collected.lock().unwrap_or_else(|e| e.into_inner());
                        match outcome {
                            Ok((language, classes)) => {
                                debug!(file = %label, classes = classes.len(), "parsed");
                                report.records.insert(language, label, classes);
                                report.files_parsed += 1;
                            }
                            Err(e) => {
                                warn!(file = %label, error = %e, "parse failed");
                                report.failures.push(ParseFailure {
                                    path: label,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                }
                if let Some(cb) = progress {
                    cb(path);
                }
            });
        });

        let mut report = collected.into_inner().unwrap_or_else(|e| e.into_inner());
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(report)
    }

    /// Parse `files` then ingest the records.
    pub fn run(
        &self,
        files: &[PathBuf],
        root: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<PipelineReport> {
        let start = Instant::now();
        info!(files = files.len(), workers = self.options.workers, "parse phase");
        let parsed = self.parse_files(files, root, progress)?;
        let ingest_report = ingest(self.backend, &parsed.records, &self.options.ingest)?;

        let report = PipelineReport {
            files_parsed: parsed.files_parsed,
            parse_failures: parsed.failures,
            ingest: ingest_report,
            elapsed_ms: start.elapsed().as_millis(),
        };
        info!(
            parsed = report.files_parsed,
            parse_failures = report.parse_failures.len(),
            elapsed_ms = report.elapsed_ms,
            "pipeline complete"
        );
        Ok(report)
    }

    /// Discover supported files under `root` and [`run`](Self::run) them.
    pub fn run_dir(&self, root: &Path, progress: Option<ProgressFn<'_>>) -> Result<PipelineReport> {
        if !root.is_dir() {
            return Err(CallGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            )));
        }
        let files = candidate_files(root);
        self.run(&files, root, progress)
    }
}
