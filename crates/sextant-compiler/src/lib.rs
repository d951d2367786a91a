//! Builds a validated, indexed `EndpointModel` from annotated handler units.
//!
//! Units are parsed and built into operation descriptors in parallel, merged
//! back in source order, then validated as a whole. Fatal per-unit problems
//! exclude only that unit; validation findings never alter the model.

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod validator;

pub use builder::build_operation;
pub use descriptor::{OperationDescriptor, Security};
pub use error::{BuildError, Cancelled, ExtractError};
pub use model::{EndpointModel, Extraction, RouteIndexEntry, EXPORT_FORMAT_VERSION};
pub use pipeline::{extract, extract_with_cancel, ExtractOptions};
pub use validator::{validate, Finding, FindingCode, Severity, ValidationContext};

// Re-export the input and record types so callers need a single dependency.
pub use sextant_parser::{
    AnnotationEntry, AnnotationRecord, AuthorizationLevel, ExampleBinding, ExampleTarget,
    HandlerUnit, HttpVerb, ParameterDescriptor, ParameterLocation, ParseError, ParseFailure,
    ParseOptions, ResponseDescriptor, RouteBinding, SchemeKind, SecurityRequirement,
    SignatureParam,
};
