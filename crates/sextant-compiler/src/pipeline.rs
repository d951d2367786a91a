use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use sextant_parser::{parse_unit, HandlerUnit, ParseOptions};

use crate::builder::build_operation;
use crate::descriptor::OperationDescriptor;
use crate::error::{BuildError, Cancelled, ExtractError};
use crate::model::Extraction;
use crate::validator::{validate, ValidationContext};

/// Options for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub parse: ParseOptions,
    pub validation: ValidationContext,
    /// Worker threads for parse+build. Clamped to at least 1.
    pub parallelism: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            validation: ValidationContext::default(),
            parallelism: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_validation(mut self, validation: ValidationContext) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }
}

type Slot = Option<Result<OperationDescriptor, ExtractError>>;

/// Extract the endpoint model from handler units.
///
/// Fatal per-unit errors exclude only that unit. The result does not depend
/// on `parallelism`.
pub fn extract(units: &[HandlerUnit], options: &ExtractOptions) -> Extraction {
    let never = AtomicBool::new(false);
    match extract_with_cancel(units, options, &never) {
        Ok(extraction) => extraction,
        Err(Cancelled) => Extraction::default(),
    }
}

/// Like [`extract`], but returns `Err(Cancelled)` as soon as `cancel` is
/// observed set. Nothing from a cancelled run is returned.
pub fn extract_with_cancel(
    units: &[HandlerUnit],
    options: &ExtractOptions,
    cancel: &AtomicBool,
) -> Result<Extraction, Cancelled> {
    let start = Instant::now();
    let workers = options.parallelism.max(1).min(units.len().max(1));

    tracing::debug!(units = units.len(), workers, "extraction started");

    let slots = process_units(units, &options.parse, workers, cancel);
    if cancel.load(Ordering::Relaxed) {
        tracing::debug!("extraction cancelled");
        return Err(Cancelled);
    }

    let (operations, errors) = merge(slots)?;

    for err in &errors {
        tracing::debug!(unit = %err.unit(), code = err.code(), "unit excluded");
    }

    let (model, findings) = validate(operations, &options.validation);

    tracing::debug!(
        operations = model.len(),
        findings = findings.len(),
        errors = errors.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "extraction completed"
    );

    Ok(Extraction {
        model,
        findings,
        errors,
    })
}

/// Merge slots in source order; a later unit reusing a name is excluded.
/// An unfilled slot means a worker stopped on cancellation.
fn merge(slots: Vec<Slot>) -> Result<(Vec<OperationDescriptor>, Vec<ExtractError>), Cancelled> {
    let mut operations = Vec::with_capacity(slots.len());
    let mut errors = Vec::new();
    let mut names: HashMap<String, Option<String>> = HashMap::new();

    for slot in slots {
        match slot.ok_or(Cancelled)? {
            Ok(op) => {
                if let Some(first_origin) = names.get(&op.name) {
                    errors.push(ExtractError::Build(BuildError::DuplicateOperationName {
                        operation: op.name,
                        first_origin: first_origin.clone(),
                    }));
                    continue;
                }
                names.insert(op.name.clone(), op.origin.clone());
                operations.push(op);
            }
            Err(err) => errors.push(err),
        }
    }

    Ok((operations, errors))
}

/// Parse and build every unit into its own slot. Each worker owns a
/// contiguous chunk of slots, so no slot is written twice.
fn process_units(
    units: &[HandlerUnit],
    parse: &ParseOptions,
    workers: usize,
    cancel: &AtomicBool,
) -> Vec<Slot> {
    let mut slots: Vec<Slot> = vec![None; units.len()];
    if units.is_empty() {
        return slots;
    }

    let chunk = units.len().div_ceil(workers);
    if workers == 1 {
        fill(units, &mut slots, parse, cancel);
        return slots;
    }

    std::thread::scope(|scope| {
        for (unit_chunk, slot_chunk) in units.chunks(chunk).zip(slots.chunks_mut(chunk)) {
            scope.spawn(move || fill(unit_chunk, slot_chunk, parse, cancel));
        }
    });

    slots
}

fn fill(units: &[HandlerUnit], slots: &mut [Slot], parse: &ParseOptions, cancel: &AtomicBool) {
    for (unit, slot) in units.iter().zip(slots.iter_mut()) {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        *slot = Some(process_unit(unit, parse));
    }
}

fn process_unit(unit: &HandlerUnit, parse: &ParseOptions) -> Result<OperationDescriptor, ExtractError> {
    let parsed = parse_unit(unit, parse)?;
    Ok(build_operation(parsed)?)
}
