use std::path::PathBuf;

use thiserror::Error;

/// A unit that could not be mapped to annotation records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{unit}: {reason}")]
pub struct ParseError {
    /// Operation name of the offending unit (may be empty).
    pub unit: String,
    pub reason: ParseFailure,
}

impl ParseError {
    pub fn new(unit: impl Into<String>, reason: ParseFailure) -> Self {
        Self {
            unit: unit.into(),
            reason,
        }
    }
}

/// Why a unit failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("{tag} annotation is missing required field '{field}'")]
    MissingField { tag: String, field: String },

    #[error("{tag} annotation has invalid value '{value}' for field '{field}'")]
    InvalidValue {
        tag: String,
        field: String,
        value: String,
    },

    #[error("unknown parameter location '{0}'")]
    UnknownLocation(String),

    #[error("unknown HTTP verb '{0}'")]
    UnknownVerb(String),

    #[error("unknown authorization level '{0}'")]
    UnknownAuthorization(String),

    #[error("unknown status code '{0}'")]
    UnknownStatus(String),

    #[error("invalid path template: {0}")]
    InvalidPathTemplate(String),

    #[error("example names both a response and a parameter as its target")]
    AmbiguousExampleTarget,

    #[error("unknown annotation '{0}'")]
    UnknownAnnotation(String),

    #[error("operation name is empty")]
    EmptyName,
}

/// Errors loading handler units from a YAML/JSON unit file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid unit file{}: {message}", display_path(.path))]
    Format {
        path: Option<PathBuf>,
        message: String,
    },
}

/// Errors scanning handler source files.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {root}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("invalid host config {path}: {message}")]
    HostConfig { path: PathBuf, message: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}
