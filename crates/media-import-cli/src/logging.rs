use std::env;
use std::path::Path;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/media-import.log";

/// Install the global subscriber: human-readable lines on stderr (stdout is
/// reserved for command output such as `scan --json`) and a plain-text copy
/// in `LOG_FILE_PATH`. Keep the returned guard alive until exit or buffered
/// file lines are lost.
pub fn init_logger() -> WorkerGuard {
    let level = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_file = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());

    let log_path = Path::new(&log_file);
    let directory = log_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "media-import.log".into());
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .without_time();
    let file = fmt::layer().with_writer(file_writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(console)
        .with(file)
        .init();

    debug!("Logging to stderr and {}", log_path.display());
    guard
}
