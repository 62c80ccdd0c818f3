//! Logging. A `tracing_subscriber::fmt` pipeline with an
//! `EnvFilter` for console output plus a daily rolling file appender —
//! the simpler of the stack's two logging layers, carried forward
//! without the OpenTelemetry/Bunyan exporters this daemon has no
//! collector to send spans to.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize the global subscriber. Returns the file appender's guard;
/// the caller must keep it alive for the process lifetime or buffered
/// log lines are dropped on exit.
pub fn init_telemetry(logs_dir: &Path) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::daily(logs_dir, "nova.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .json();

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
