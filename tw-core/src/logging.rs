//! Structured logging setup using the `tracing` ecosystem.
//!
//! Console output goes to stderr so command output on stdout stays
//! parseable. A second layer writes a daily-rotated file, as plain text or
//! JSON.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::LOG_FILE_NAME;
use crate::error::TwResult;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Directives appended to every filter. The connection pool logs every
/// checkout at debug level.
const QUIET_DEPENDENCIES: &[&str] = &["r2d2=warn"];

/// Initialize the global tracing subscriber.
///
/// * `level` - Filter directive ("info", "debug", "tw_services=trace", ...)
/// * `log_dir` - Directory for rotated log files
/// * `json_output` - Write the file layer as JSON
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> TwResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));

    tracing_subscriber::registry()
        .with(vec![console_layer(), file_layer(writer, json_output)])
        .with(build_filter(level))
        .init();

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Keeps the non-blocking log writer alive. Drop to flush.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Initialize a minimal console-only logger for tests or simple CLI usage.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(console_layer())
        .with(build_filter(level))
        .try_init();
}

fn console_layer() -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .boxed()
}

fn file_layer(writer: NonBlocking, json_output: bool) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    if json_output {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Parse `level`, falling back to `info` when it is not a valid directive.
fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in QUIET_DEPENDENCIES {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}
