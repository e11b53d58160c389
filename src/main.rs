//! `codepecker` command-line interface.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use codepecker::config::{self, BackendKind, CodepeckerConfig};
use codepecker::graph::traversal::{CallTree, MAX_REVERSE_DEPTH};
use codepecker::graph::{open_backend, GraphBackend, IngestOptions, TraversalEngine};
use codepecker::indexer::discover::{candidate_files, files_from_entrypoints, EntryPoint};
use codepecker::indexer::{Pipeline, PipelineOptions, PipelineReport};
use codepecker::{observability, CallGraphError, Result};

#[derive(Parser)]
#[command(name = "codepecker")]
#[command(about = "Static call graphs for C# and Java", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database path (overrides config and CODEPECKER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Storage backend: sqlite or memory (memory keeps nothing between runs,
    /// so it only suits `ingest`)
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a source tree and merge it into the graph
    Ingest {
        /// Project root
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Clear the graph first
        #[arg(long)]
        reset: bool,

        /// Parser threads
        #[arg(long)]
        workers: Option<usize>,

        /// JSON list of {name, file, type} entry points; only their files are parsed
        #[arg(long)]
        entrypoints: Option<PathBuf>,

        /// Do not store method source text
        #[arg(long)]
        no_definitions: bool,
    },

    /// Remove every node and edge
    Reset,

    /// List classes
    Classes,

    /// Methods and calls of one class
    Class { name: String },

    /// Methods reachable from Class.Method
    Tree {
        class: String,
        method: String,
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Shortest call path between two methods
    Path {
        from_class: String,
        from_method: String,
        to_class: String,
        to_method: String,
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Methods that reach Class.Method
    Callers {
        class: String,
        method: String,
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Per-method call counts
    Stats {
        #[arg(long)]
        class: Option<String>,
    },

    /// Text dump of every class and method
    Dump,
}

impl Commands {
    /// `true` for commands that are meaningful against a graph that lives
    /// only as long as this process.
    fn runs_without_persistence(&self) -> bool {
        matches!(self, Self::Ingest { .. })
    }
}

fn check_backend(kind: BackendKind, command: &Commands) -> Result<()> {
    if matches!(kind, BackendKind::Memory) && !command.runs_without_persistence() {
        return Err(CallGraphError::Config(
            "the memory backend starts empty in every run; use the sqlite backend for queries".into(),
        ));
    }
    Ok(())
}

fn parse_backend(s: &str) -> std::result::Result<BackendKind, String> {
    BackendKind::from_str_loose(s).ok_or_else(|| format!("unknown backend {s:?} (sqlite, memory)"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init_logging_with(cli.verbose.then_some("codepecker=debug"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = config::load(&cwd)?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }

    check_backend(config.database.backend, &cli.command)?;

    let backend = open_backend(&config.database)?;
    let engine = TraversalEngine::new(backend.as_ref());
    let json = cli.json;

    match cli.command {
        Commands::Ingest {
            dir,
            reset,
            workers,
            entrypoints,
            no_definitions,
        } => {
            if reset {
                backend.reset()?;
            }
            let report = run_ingest(
                backend.as_ref(),
                &config,
                &dir,
                workers,
                entrypoints.as_deref(),
                no_definitions,
            )?;
            if json {
                print_json(&report)?;
            } else {
                print_ingest_summary(&report);
            }
        }
        Commands::Reset => {
            backend.reset()?;
            if !json {
                println!("graph cleared");
            }
        }
        Commands::Classes => {
            let classes = engine.classes()?;
            if json {
                print_json(&classes)?;
            } else {
                for c in classes {
                    println!("{}  {}  {}", c.name, c.file_path, c.visibility);
                }
            }
        }
        Commands::Class { name } => {
            let graph = engine.class_graph(&name)?;
            if json {
                print_json(&graph)?;
            } else {
                println!("{} ({})", graph.class_name, graph.files.join(", "));
                for m in graph.methods {
                    println!("  {} [{}]", m.name, m.visibility);
                    for target in m.resolved_calls {
                        println!("    -> {target}");
                    }
                    for raw in m.unresolved_calls {
                        println!("    -> ? {raw}");
                    }
                }
            }
        }
        Commands::Tree {
            class,
            method,
            depth,
        } => {
            let depth = depth.unwrap_or(config.query.default_tree_depth);
            let tree = engine.call_tree(&class, &method, depth)?;
            if json {
                print_json(&tree)?;
            } else {
                print_tree(&tree);
            }
        }
        Commands::Callers {
            class,
            method,
            depth,
        } => {
            let depth = depth.unwrap_or(config.query.default_tree_depth.min(MAX_REVERSE_DEPTH));
            let tree = engine.reverse_call_stack(&class, &method, depth)?;
            if json {
                print_json(&tree)?;
            } else {
                print_tree(&tree);
            }
        }
        Commands::Path {
            from_class,
            from_method,
            to_class,
            to_method,
            depth,
        } => {
            let depth = depth.unwrap_or(config.query.default_path_depth);
            let path = engine.call_path(&from_class, &from_method, &to_class, &to_method, depth)?;
            if json {
                print_json(&path)?;
            } else {
                match path {
                    Some(path) => {
                        for step in path.steps {
                            println!("{}. {}.{}", step.index, step.class_name, step.method_name);
                        }
                    }
                    None => println!("no path within depth {depth}"),
                }
            }
        }
        Commands::Stats { class } => {
            let stats = engine.call_statistics(class.as_deref())?;
            if json {
                print_json(&stats)?;
            } else {
                for m in &stats.methods {
                    println!(
                        "{}.{}  out={}  in={}",
                        m.class_name, m.method_name, m.outgoing, m.incoming
                    );
                }
                let s = &stats.summary;
                println!(
                    "{} methods, {} calling, {} called, {} resolved calls",
                    s.total_methods,
                    s.methods_with_outgoing,
                    s.methods_with_incoming,
                    s.total_resolved_calls
                );
            }
        }
        Commands::Dump => {
            let text = engine.render_text()?;
            if json {
                print_json(&text)?;
            } else {
                print!("{text}");
            }
        }
    }
    Ok(())
}

fn run_ingest(
    backend: &dyn GraphBackend,
    config: &CodepeckerConfig,
    dir: &Path,
    workers: Option<usize>,
    entrypoints: Option<&Path>,
    no_definitions: bool,
) -> Result<PipelineReport> {
    let options = PipelineOptions {
        workers: workers.unwrap_or(config.ingest.workers),
        languages: config.ingest.languages.clone(),
        ingest: IngestOptions {
            keep_definitions: config.ingest.include_definitions && !no_definitions,
        },
    };
    let pipeline = Pipeline::new(backend, options);

    let files = match entrypoints {
        Some(path) => {
            let entries: Vec<EntryPoint> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            files_from_entrypoints(&entries, dir)
        }
        None => {
            if !dir.is_dir() {
                return Err(CallGraphError::Config(format!(
                    "not a directory: {}",
                    dir.display()
                )));
            }
            candidate_files(dir)
        }
    };

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("parsing");
    let tick = |_: &Path| bar.inc(1);
    let report = pipeline.run(&files, dir, Some(&tick));
    bar.finish_and_clear();
    report
}

fn print_ingest_summary(report: &PipelineReport) {
    let ingest = &report.ingest;
    println!("files parsed:      {}", report.files_parsed);
    println!("parse failures:    {}", report.parse_failures.len());
    println!("classes:           {}", ingest.classes);
    println!("methods:           {}", ingest.methods);
    println!("resolved edges:    {}", ingest.resolved_edges);
    println!("unresolved edges:  {}", ingest.unresolved_edges);
    for f in &report.parse_failures {
        println!("  ! {}: {}", f.path, f.reason);
    }
    for f in &ingest.failures {
        println!("  ! {}: {}", f.file_path, f.reason);
    }
    println!("done in {} ms", report.elapsed_ms);
}

fn print_tree(tree: &CallTree) {
    for (level, nodes) in &tree.levels {
        for node in nodes {
            println!(
                "{}{} [{}]",
                "  ".repeat(*level as usize),
                node.qualified_name(),
                node.visibility
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
