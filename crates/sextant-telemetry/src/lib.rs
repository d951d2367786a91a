//! Logging setup for the Sextant command line.
//!
//! Library crates only emit `tracing` events; this crate installs the
//! subscriber that renders them, as JSON or human-readable text on stderr.
//!
//! # Usage
//!
//! ```ignore
//! use sextant_telemetry::{LogFormat, Telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Json);
//!
//! let telemetry = Telemetry::init(config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The configured log level is not a valid filter directive.
    #[error("invalid log level '{level}': {message}")]
    InvalidLevel { level: String, message: String },
}

/// Telemetry handle. Holds the configuration the subscriber was built from.
#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
}

impl Telemetry {
    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        logging::init_logging(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}
