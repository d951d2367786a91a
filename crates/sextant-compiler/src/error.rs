use serde::{Serialize, Serializer};
use thiserror::Error;

use sextant_parser::{ParameterLocation, ParseError, ParseFailure};

/// A parsed unit that cannot become an operation descriptor (E2020–E2026).
///
/// E2024 is unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// E2020: No route binding.
    #[error("E2020: operation '{operation}' has no route binding")]
    MissingRoute { operation: String },

    /// E2021: More than one route binding.
    #[error("E2021: operation '{operation}' has {} route bindings: {}", .routes.len(), .routes.join(", "))]
    AmbiguousRoute {
        operation: String,
        routes: Vec<String>,
    },

    /// E2022: Same parameter name declared twice in one location.
    #[error("E2022: operation '{operation}' declares {location} parameter '{name}' more than once")]
    DuplicateParameter {
        operation: String,
        name: String,
        location: ParameterLocation,
    },

    /// E2023: Same status code declared twice.
    #[error("E2023: operation '{operation}' declares response {status} more than once")]
    DuplicateResponse { operation: String, status: u16 },

    /// E2025: Same example id declared twice.
    #[error("E2025: operation '{operation}' declares example '{id}' more than once")]
    DuplicateExample { operation: String, id: String },

    /// E2026: Operation name already taken by an earlier unit.
    #[error("E2026: operation name '{operation}' is already used{}", first_origin_suffix(.first_origin))]
    DuplicateOperationName {
        operation: String,
        first_origin: Option<String>,
    },
}

fn first_origin_suffix(origin: &Option<String>) -> String {
    match origin {
        Some(origin) => format!(" (first declared at {origin})"),
        None => String::new(),
    }
}

impl BuildError {
    /// Name of the operation the error concerns.
    pub fn operation(&self) -> &str {
        match self {
            Self::MissingRoute { operation }
            | Self::AmbiguousRoute { operation, .. }
            | Self::DuplicateParameter { operation, .. }
            | Self::DuplicateResponse { operation, .. }
            | Self::DuplicateExample { operation, .. }
            | Self::DuplicateOperationName { operation, .. } => operation,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRoute { .. } => "E2020",
            Self::AmbiguousRoute { .. } => "E2021",
            Self::DuplicateParameter { .. } => "E2022",
            Self::DuplicateResponse { .. } => "E2023",
            Self::DuplicateExample { .. } => "E2025",
            Self::DuplicateOperationName { .. } => "E2026",
        }
    }
}

/// A fatal per-unit error. The unit is excluded from the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// E2001–E2010: The unit's annotations could not be parsed.
    #[error("{}: {}", parse_code(&.0.reason), .0)]
    Parse(#[from] ParseError),

    /// E2020–E2026: The parsed unit could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ExtractError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(e) => parse_code(&e.reason),
            Self::Build(e) => e.code(),
        }
    }

    /// Name of the offending unit.
    pub fn unit(&self) -> &str {
        match self {
            Self::Parse(e) => &e.unit,
            Self::Build(e) => e.operation(),
        }
    }
}

fn parse_code(reason: &ParseFailure) -> &'static str {
    match reason {
        ParseFailure::MissingField { .. } => "E2001",
        ParseFailure::InvalidValue { .. } => "E2002",
        ParseFailure::UnknownLocation(_) => "E2003",
        ParseFailure::UnknownVerb(_) => "E2004",
        ParseFailure::UnknownAuthorization(_) => "E2005",
        ParseFailure::UnknownStatus(_) => "E2006",
        ParseFailure::InvalidPathTemplate(_) => "E2007",
        ParseFailure::AmbiguousExampleTarget => "E2008",
        ParseFailure::UnknownAnnotation(_) => "E2009",
        ParseFailure::EmptyName => "E2010",
    }
}

/// Serialized as `{ code, unit, message }` in exports and JSON reports.
impl Serialize for ExtractError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ExtractError", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("unit", self.unit())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Returned when extraction is cancelled before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("extraction cancelled")]
pub struct Cancelled;
