use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sextant_router::Placeholder;

use crate::error::{LoadError, ParseError, ParseFailure};
use crate::model::{
    AnnotationEntry, AnnotationRecord, AuthorizationLevel, ExampleBinding, ExampleTarget,
    HandlerUnit, HttpVerb, ParameterDescriptor, ParameterLocation, ParsedUnit,
    ResponseDescriptor, RouteBinding, SchemeKind, SecurityRequirement,
};
use crate::status::parse_status;

/// Options controlling annotation parsing.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Reject annotations with an unrecognized tag instead of ignoring them.
    pub strict: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Recognized annotation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Route,
    Security,
    Parameter,
    RequestBody,
    Response,
    Example,
    Operation,
}

impl Tag {
    fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().replace('-', "_").as_str() {
            "route" => Some(Self::Route),
            "security" => Some(Self::Security),
            "parameter" => Some(Self::Parameter),
            "request_body" => Some(Self::RequestBody),
            "response" => Some(Self::Response),
            "example" => Some(Self::Example),
            "operation" => Some(Self::Operation),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Security => "security",
            Self::Parameter => "parameter",
            Self::RequestBody => "request_body",
            Self::Response => "response",
            Self::Example => "example",
            Self::Operation => "operation",
        }
    }
}

/// Map one handler unit to typed annotation records.
pub fn parse_unit(unit: &HandlerUnit, options: &ParseOptions) -> Result<ParsedUnit, ParseError> {
    let name = unit.name.trim();
    if name.is_empty() {
        return Err(ParseError::new(&unit.name, ParseFailure::EmptyName));
    }

    let mut parsed = ParsedUnit {
        name: name.to_string(),
        tags: Vec::new(),
        summary: None,
        description: None,
        records: Vec::new(),
        signature: unit.signature.clone(),
        origin: unit.origin.clone(),
    };

    for entry in &unit.annotations {
        parse_entry(entry, options, &mut parsed).map_err(|reason| ParseError::new(name, reason))?;
    }

    tracing::debug!(
        unit = %parsed.name,
        records = parsed.records.len(),
        "parsed handler unit"
    );

    Ok(parsed)
}

fn parse_entry(
    entry: &AnnotationEntry,
    options: &ParseOptions,
    parsed: &mut ParsedUnit,
) -> Result<(), ParseFailure> {
    let Some(tag) = Tag::parse(&entry.tag) else {
        if options.strict {
            return Err(ParseFailure::UnknownAnnotation(entry.tag.clone()));
        }
        tracing::debug!(unit = %parsed.name, tag = %entry.tag, "ignoring unknown annotation");
        return Ok(());
    };

    let fields = Fields::new(tag.as_str(), &entry.fields);

    match tag {
        Tag::Route => parsed.records.extend(parse_route(&fields)?),
        Tag::Security => parsed.records.push(parse_security(&fields)?),
        Tag::Parameter => parsed.records.push(parse_parameter(&fields)?),
        Tag::RequestBody => parsed.records.push(parse_request_body(&fields)?),
        Tag::Response => parsed.records.push(parse_response(&fields)?),
        Tag::Example => parsed.records.push(parse_example(&fields)?),
        Tag::Operation => {
            parsed.tags.extend(fields.list(&["tags", "tag"])?);
            if let Some(summary) = fields.string(&["summary"])? {
                parsed.summary.get_or_insert(summary);
            }
            if let Some(description) = fields.string(&["description"])? {
                parsed.description.get_or_insert(description);
            }
        }
    }

    Ok(())
}

/// A route annotation may list several verbs; each becomes its own binding.
fn parse_route(fields: &Fields<'_>) -> Result<Vec<AnnotationRecord>, ParseFailure> {
    let verbs = fields.list(&["verb", "method", "methods", "verbs"])?;
    if verbs.is_empty() {
        return Err(fields.missing("verb"));
    }

    let path = fields.required(&["path", "route"], "path")?;
    validate_path_template(&path)?;

    let authorization = match fields.string(&["authorization", "auth_level"])? {
        Some(level) => AuthorizationLevel::parse(&level)
            .ok_or(ParseFailure::UnknownAuthorization(level))?,
        None => AuthorizationLevel::Anonymous,
    };

    verbs
        .into_iter()
        .map(|raw| {
            let verb = HttpVerb::parse(&raw).ok_or(ParseFailure::UnknownVerb(raw))?;
            Ok(AnnotationRecord::RouteBinding(RouteBinding {
                verb,
                path: path.clone(),
                authorization,
            }))
        })
        .collect()
}

fn parse_security(fields: &Fields<'_>) -> Result<AnnotationRecord, ParseFailure> {
    let scheme = fields.required(&["scheme", "name"], "scheme")?;

    let kind = match fields.string(&["kind", "scheme_type"])? {
        Some(kind) => SchemeKind::parse(&kind).ok_or_else(|| fields.invalid("kind", &kind))?,
        None => SchemeKind::Http,
    };

    Ok(AnnotationRecord::SecurityRequirement(SecurityRequirement {
        scheme,
        kind,
        bearer_format: fields.string(&["bearer_format"])?,
        http_scheme: fields.string(&["http_scheme"])?,
        groups: fields.list(&["groups"])?,
        operation_type: fields.string(&["operation_type"])?,
    }))
}

fn parse_parameter(fields: &Fields<'_>) -> Result<AnnotationRecord, ParseFailure> {
    let name = fields.required(&["name"], "name")?;
    let raw_location = fields.required(&["in", "location"], "in")?;
    let location =
        ParameterLocation::parse(&raw_location).ok_or(ParseFailure::UnknownLocation(raw_location))?;

    let required = fields
        .boolean(&["required"])?
        .unwrap_or(location == ParameterLocation::Path);

    Ok(AnnotationRecord::ParameterDescriptor(ParameterDescriptor {
        name,
        location,
        required,
        type_name: fields.string(&["type", "type_name"])?,
        description: fields.string(&["description"])?,
        example: fields.string(&["example"])?,
        content_type: fields.string(&["content_type"])?,
    }))
}

fn parse_request_body(fields: &Fields<'_>) -> Result<AnnotationRecord, ParseFailure> {
    Ok(AnnotationRecord::ParameterDescriptor(ParameterDescriptor {
        name: fields
            .string(&["name"])?
            .unwrap_or_else(|| "body".to_string()),
        location: ParameterLocation::Body,
        required: fields.boolean(&["required"])?.unwrap_or(false),
        type_name: fields.string(&["type", "body_type"])?,
        description: fields.string(&["description"])?,
        example: fields.string(&["example"])?,
        content_type: fields.string(&["content_type"])?,
    }))
}

fn parse_response(fields: &Fields<'_>) -> Result<AnnotationRecord, ParseFailure> {
    let raw = fields
        .get(&["status", "status_code", "code"])
        .ok_or_else(|| fields.missing("status"))?;
    let status = parse_status(raw).ok_or_else(|| ParseFailure::UnknownStatus(render(raw)))?;

    Ok(AnnotationRecord::ResponseDescriptor(ResponseDescriptor {
        status,
        description: fields.string(&["description"])?,
        content_type: fields.string(&["content_type"])?,
        body_type: fields.string(&["body_type", "type"])?,
        example: fields.string(&["example"])?,
    }))
}

fn parse_example(fields: &Fields<'_>) -> Result<AnnotationRecord, ParseFailure> {
    let id = fields.required(&["id", "name"], "id")?;

    let response = fields.get(&["response"]).filter(|v| !v.is_null());
    let parameter = fields.string(&["parameter"])?;

    let target = match (response, parameter) {
        (Some(_), Some(_)) => return Err(ParseFailure::AmbiguousExampleTarget),
        (Some(raw), None) => Some(ExampleTarget::Response(
            parse_status(raw).ok_or_else(|| ParseFailure::UnknownStatus(render(raw)))?,
        )),
        (None, Some(name)) => Some(ExampleTarget::Parameter(name)),
        (None, None) => None,
    };

    Ok(AnnotationRecord::ExampleBinding(ExampleBinding { id, target }))
}

/// Check a route path template.
///
/// Rejects nested or unbalanced braces, empty or non-identifier placeholder
/// names, duplicate placeholders and catch-alls that are not the last segment.
pub fn validate_path_template(path: &str) -> Result<(), ParseFailure> {
    let invalid = |detail: String| ParseFailure::InvalidPathTemplate(format!("{path} - {detail}"));

    let mut seen_params: HashSet<String> = HashSet::new();
    let mut current = String::new();
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            '{' => {
                if in_param {
                    return Err(invalid("nested braces not allowed".into()));
                }
                in_param = true;
                current.clear();
            }
            '}' => {
                if !in_param {
                    return Err(invalid("unmatched closing brace".into()));
                }
                in_param = false;

                let placeholder = Placeholder::parse(&current)
                    .ok_or_else(|| invalid("empty parameter name".into()))?;
                if !is_identifier(&placeholder.name) {
                    return Err(invalid(format!(
                        "invalid parameter name '{}'",
                        placeholder.name
                    )));
                }
                if !seen_params.insert(placeholder.name.clone()) {
                    return Err(invalid(format!(
                        "duplicate parameter '{}'",
                        placeholder.name
                    )));
                }
            }
            _ if in_param => current.push(ch),
            _ => {}
        }
    }

    if in_param {
        return Err(invalid("unclosed brace".into()));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for (i, segment) in segments.iter().enumerate() {
        let catch_all = sextant_router::placeholders(segment)
            .iter()
            .any(|p| p.catch_all);
        if catch_all && i + 1 != segments.len() {
            return Err(invalid("catch-all parameter must be the last segment".into()));
        }
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Case-insensitive view over an annotation's fields.
///
/// Keys compare with case, `_` and `-` ignored, so `bearer_format`,
/// `BearerFormat` and `bearer-format` are the same field.
struct Fields<'a> {
    tag: &'a str,
    map: BTreeMap<String, &'a Value>,
}

impl<'a> Fields<'a> {
    fn new(tag: &'a str, fields: &'a BTreeMap<String, Value>) -> Self {
        let map = fields.iter().map(|(k, v)| (fold_key(k), v)).collect();
        Self { tag, map }
    }

    fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|k| self.map.get(&fold_key(k)).copied())
    }

    fn missing(&self, field: &str) -> ParseFailure {
        ParseFailure::MissingField {
            tag: self.tag.to_string(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, value: &str) -> ParseFailure {
        ParseFailure::InvalidValue {
            tag: self.tag.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// A scalar field rendered as a string. `null` and empty strings count as absent.
    fn string(&self, keys: &[&str]) -> Result<Option<String>, ParseFailure> {
        match self.get(keys) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            Some(other) => Err(self.invalid(keys[0], &render(other))),
        }
    }

    fn required(&self, keys: &[&str], field: &str) -> Result<String, ParseFailure> {
        self.string(keys)?.ok_or_else(|| self.missing(field))
    }

    fn boolean(&self, keys: &[&str]) -> Result<Option<bool>, ParseFailure> {
        match self.get(keys) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(self.invalid(keys[0], &render(other))),
        }
    }

    /// A list of strings, or a single comma-separated string.
    fn list(&self, keys: &[&str]) -> Result<Vec<String>, ParseFailure> {
        match self.get(keys) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(split_list(s)),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.extend(split_list(s)),
                        other => return Err(self.invalid(keys[0], &render(other))),
                    }
                }
                Ok(out)
            }
            Some(other) => Err(self.invalid(keys[0], &render(other))),
        }
    }
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shapes accepted for a unit file.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitFile {
    Wrapped { units: Vec<HandlerUnit> },
    Bare(Vec<HandlerUnit>),
}

/// Load handler units from a YAML or JSON document.
///
/// Accepts either `units: [...]` or a bare list.
pub fn parse_units(input: &str) -> Result<Vec<HandlerUnit>, LoadError> {
    // JSON is valid YAML.
    let file: UnitFile = serde_yaml::from_str(input).map_err(|e| LoadError::Format {
        path: None,
        message: e.to_string(),
    })?;

    Ok(match file {
        UnitFile::Wrapped { units } => units,
        UnitFile::Bare(units) => units,
    })
}

/// Load handler units from a file, recording `file#n` as each unit's origin
/// unless the file already provides one.
pub fn parse_units_file(path: &Path) -> Result<Vec<HandlerUnit>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut units = parse_units(&content).map_err(|e| match e {
        LoadError::Format { message, .. } => LoadError::Format {
            path: Some(path.to_path_buf()),
            message,
        },
        other => other,
    })?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    for (i, unit) in units.iter_mut().enumerate() {
        if unit.origin.is_none() {
            unit.origin = Some(format!("{}#{}", file_name, i + 1));
        }
    }

    tracing::debug!(path = %path.display(), units = units.len(), "loaded unit file");
    Ok(units)
}
