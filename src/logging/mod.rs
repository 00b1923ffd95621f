//! Logging framework for the alignment library
//!
//! Structured `tracing` output with per-component levels, per-level spans,
//! per-iteration metrics and correlation ids tying together the events of
//! one pipeline run.

pub mod config;
pub mod metrics;
pub mod spans;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

pub use config::LoggingConfig;
pub use metrics::{IterationRecord, LevelStats, MetricsCollector};
pub use spans::{AlignmentSpan, PipelineSpan};

thread_local! {
    static CORRELATION_ID: std::cell::RefCell<Option<Uuid>> = const { std::cell::RefCell::new(None) };
}

/// Keeps the non-blocking file writer alive; drop it to flush.
#[must_use]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global subscriber with the provided configuration.
///
/// `RUST_LOG` overrides the configured levels. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let mut layers = Vec::new();
    let mut file_guard = None;

    if config.console_output {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(config.include_file_location)
            .with_file(config.include_file_location)
            .with_writer(std::io::stderr);
        layers.push(console_layer.boxed());
    }

    if let Some(ref log_dir) = config.log_directory {
        let file_appender = tracing_appender::rolling::daily(log_dir, &config.file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(?config, "Logging system initialized");
    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Tag everything logged on this thread with `id`, typically one
/// pipeline run
pub fn set_correlation_id(id: Uuid) {
    CORRELATION_ID.with(|cell| cell.replace(Some(id)));
}

pub fn get_correlation_id() -> Option<Uuid> {
    CORRELATION_ID.with(|cell| *cell.borrow())
}

/// Start a fresh run id on this thread and return it
pub fn new_correlation_id() -> Uuid {
    let id = Uuid::new_v4();
    set_correlation_id(id);
    id
}

pub fn clear_correlation_id() {
    CORRELATION_ID.with(|cell| cell.replace(None));
}

/// `tracing::span!` carrying the thread's run id when one is set
#[macro_export]
macro_rules! correlation_span {
    ($level:expr, $name:expr) => {
        if let Some(correlation_id) = $crate::logging::get_correlation_id() {
            tracing::span!($level, $name, correlation_id = %correlation_id)
        } else {
            tracing::span!($level, $name)
        }
    };
    ($level:expr, $name:expr, $($field:tt)*) => {
        if let Some(correlation_id) = $crate::logging::get_correlation_id() {
            tracing::span!($level, $name, correlation_id = %correlation_id, $($field)*)
        } else {
            tracing::span!($level, $name, $($field)*)
        }
    };
}
