//! Annotation parser for annotated HTTP handler definitions.
//!
//! A handler unit is the tokenized view of one handler: its operation name,
//! a list of annotation entries (tag + field map) and its parameter
//! signature. The parser maps each unit to typed [`AnnotationRecord`]s.
//! Units can be built in code, loaded from YAML/JSON unit files, or scanned
//! from attribute-annotated source with the [`source`] module.

pub mod error;
pub mod model;
pub mod parser;
pub mod source;
pub mod status;

pub use error::{LoadError, ParseError, ParseFailure, ScanError};
pub use model::{
    AnnotationEntry, AnnotationRecord, AuthorizationLevel, ExampleBinding, ExampleTarget,
    HandlerUnit, HttpVerb, ParameterDescriptor, ParameterLocation, ParsedUnit,
    ResponseDescriptor, RouteBinding, SchemeKind, SecurityRequirement, SignatureParam,
};
pub use parser::{
    parse_unit, parse_units, parse_units_file, validate_path_template, ParseOptions,
};
pub use source::{scan_directory, scan_file, scan_source};
