use std::io;
use tracing::dispatcher::DefaultGuard;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::{fmt, registry};

use crate::simulation::config::{Config, Logging};

// This is a helper struct to store the log file guard. When it is dropped, pending log lines are flushed.
#[allow(dead_code)]
pub struct LogGuards {
    log_guard: Option<WorkerGuard>,
}

/// Logging for the current thread only. Used by tests and before the config is loaded.
pub fn init_std_out_logging_thread_local() -> DefaultGuard {
    let collector = registry().with(
        fmt::Layer::new()
            .with_writer(io::stdout)
            .with_filter(std_out_filter()),
    );
    tracing::subscriber::set_default(collector)
}

/// Installs the process wide collector. Vehicles run on the worker threads of a tokio runtime,
/// so a thread local default would not reach them.
///
/// Console output is at INFO, unless RUST_LOG says otherwise. If `output.logging` is `Info`, an
/// additional json log file is written into the output directory.
pub fn init_logging(config: &Config) -> Result<LogGuards, SetGlobalDefaultError> {
    let dir = config.output_dir();

    let (log_layer, log_guard) = if Logging::Info == config.output().logging {
        let log_file_appender = rolling::never(&dir, "log_fleet.txt");
        let (log_file, log_guard) = non_blocking(log_file_appender);
        let layer = fmt::Layer::new()
            .with_writer(log_file)
            .json()
            .with_ansi(false)
            .with_filter(LevelFilter::INFO);
        (Some(layer), Some(log_guard))
    } else {
        (None, None)
    };

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(std_out_filter());

    // Add `Optional`s. If None, then the corresponding layer is not added.
    let collector = registry().with(log_layer).with(console_layer);

    tracing::subscriber::set_global_default(collector)?;

    Ok(LogGuards { log_guard })
}

fn std_out_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}
