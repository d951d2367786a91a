//! Loading handler units from unit files and source trees.

use std::path::{Path, PathBuf};

use thiserror::Error;

use sextant_compiler::HandlerUnit;
use sextant_parser::{parse_units_file, scan_directory, scan_file, LoadError, ScanError};
use sextant_telemetry::log_units_loaded;

/// An input that could not be read. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum InputError {
    /// E2000: Input path does not exist.
    #[error("E2000: input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("E2000: {0}")]
    Load(#[from] LoadError),

    #[error("E2000: {0}")]
    Scan(#[from] ScanError),
}

/// Where handler units come from.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// YAML or JSON unit files.
    pub unit_files: Vec<PathBuf>,
    /// Source files or directories to scan.
    pub sources: Vec<PathBuf>,
}

impl Inputs {
    pub fn is_empty(&self) -> bool {
        self.unit_files.is_empty() && self.sources.is_empty()
    }
}

/// Load every input in order: unit files first, then sources.
pub fn load_units(inputs: &Inputs) -> Result<Vec<HandlerUnit>, InputError> {
    let mut units = Vec::new();

    for path in &inputs.unit_files {
        ensure_exists(path)?;
        let loaded = parse_units_file(path)?;
        log_units_loaded!(input = %path.display(), kind = "units", units = loaded.len());
        units.extend(loaded);
    }

    for path in &inputs.sources {
        ensure_exists(path)?;
        let scanned = if path.is_dir() {
            scan_directory(path)?
        } else {
            scan_file(path)?
        };
        log_units_loaded!(input = %path.display(), kind = "source", units = scanned.len());
        units.extend(scanned);
    }

    Ok(units)
}

fn ensure_exists(path: &Path) -> Result<(), InputError> {
    if path.exists() {
        Ok(())
    } else {
        Err(InputError::NotFound(path.to_path_buf()))
    }
}
