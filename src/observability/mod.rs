//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "codepecker=info";

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `codepecker=info` when `RUST_LOG` is not set. Logs go to
/// stderr so `--json` output on stdout stays machine-readable.
pub fn init_logging() {
    init_logging_with(None);
}

/// As [`init_logging`], with an explicit directive (e.g. `codepecker=debug`)
/// taking precedence over `RUST_LOG`.
pub fn init_logging_with(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
