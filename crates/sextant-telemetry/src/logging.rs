//! Structured logging to stderr.
//!
//! Stdout is reserved for reports and exports, so every event goes to
//! stderr, as JSON lines or in human-readable form.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(&config.log_level)?;

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| TelemetryError::InvalidLevel {
        level: level.to_string(),
        message: e.to_string(),
    })
}

/// Initialize JSON logging.
fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Initialize human-readable logging.
fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// The command line has started.
    pub const STARTUP: &str = "startup";

    /// Handler units have been loaded or scanned from one input.
    pub const UNITS_LOADED: &str = "units_loaded";

    /// An extraction run has started.
    pub const EXTRACTION_STARTED: &str = "extraction_started";

    /// An extraction run has completed.
    pub const EXTRACTION_COMPLETED: &str = "extraction_completed";

    /// A unit was excluded from the model by a fatal error.
    pub const UNIT_EXCLUDED: &str = "unit_excluded";

    /// An export document has been written.
    pub const EXPORT_WRITTEN: &str = "export_written";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_units_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::UNITS_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_extraction_started {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::EXTRACTION_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_extraction_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::EXTRACTION_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_unit_excluded {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::UNIT_EXCLUDED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_export_written {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::EXPORT_WRITTEN,
            $($field)*
        )
    };
}
