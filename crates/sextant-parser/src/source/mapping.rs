//! Map attribute decorations on a handler method to annotation entries.

use std::collections::HashSet;

use serde_json::Value;

use super::attribute::{split_top_level, ArgValue, Attribute};
use crate::model::{AnnotationEntry, HandlerUnit, SignatureParam};

/// Parameter modifiers that never form part of the type.
const PARAM_MODIFIERS: &[&str] = &["this", "ref", "out", "in", "params", "scoped"];

/// A method declaration with the attributes that precede it.
pub(crate) struct MethodDecl<'a> {
    pub name: &'a str,
    pub attributes: &'a [Attribute],
    /// Text between the parameter list's parentheses.
    pub params: &'a str,
    /// `file:line` of the first attribute.
    pub origin: String,
}

/// Build a handler unit, or `None` for helpers and non-HTTP functions.
pub(crate) fn build_unit(decl: &MethodDecl<'_>) -> Option<HandlerUnit> {
    let function = decl.attributes.iter().find(|a| a.name == "Function")?;
    let name = function
        .ctor_arg(0, "name")
        .and_then(ArgValue::text)
        .unwrap_or_else(|| decl.name.to_string());

    let (signature, param_attributes) = parse_signature(decl.params);
    let Some(trigger) = param_attributes.iter().find(|a| a.name == "HttpTrigger") else {
        tracing::debug!(function = %name, origin = %decl.origin, "skipping function without an HTTP trigger");
        return None;
    };

    let mut unit = HandlerUnit::new(&name).with_origin(&decl.origin);
    unit.signature = signature;
    unit.annotations.extend(route_entries(trigger, &name));

    let mut declared_examples = HashSet::new();
    for attribute in decl.attributes.iter().filter(|a| a.name != "Function") {
        map_attribute(attribute, &mut unit.annotations, &mut declared_examples);
    }

    Some(unit)
}

/// One route entry per verb. A missing or `null` route falls back to the
/// function name, as the host does.
fn route_entries(trigger: &Attribute, function: &str) -> Vec<AnnotationEntry> {
    let mut level = None;
    let mut verbs = Vec::new();

    for value in trigger.ctor_args() {
        match value {
            ArgValue::Symbol(s) if level.is_none() => level = Some(s.clone()),
            ArgValue::Str(verb) => verbs.push(verb.clone()),
            ArgValue::List(items) => verbs.extend(items.iter().filter_map(ArgValue::text)),
            _ => {}
        }
    }

    let path = match trigger.property("Route") {
        Some(ArgValue::Str(route)) => route.clone(),
        _ => function.to_string(),
    };

    let base = |entry: AnnotationEntry| {
        let entry = entry.field("path", path.clone());
        match &level {
            Some(level) => entry.field("authorization", level.clone()),
            None => entry,
        }
    };

    if verbs.is_empty() {
        // Reported by the parser as a missing verb.
        return vec![base(AnnotationEntry::new("route"))];
    }
    verbs
        .into_iter()
        .map(|verb| base(AnnotationEntry::new("route").field("verb", verb)))
        .collect()
}

fn map_attribute(
    attribute: &Attribute,
    entries: &mut Vec<AnnotationEntry>,
    declared_examples: &mut HashSet<String>,
) {
    match attribute.name.as_str() {
        "OpenApiSecurity" => entries.push(
            AnnotationEntry::new("security")
                .field("scheme", json_text(attribute.ctor_arg(0, "schemeName")))
                .field("kind", json_text(attribute.ctor_arg(1, "schemeType")))
                .field("bearer_format", json_text(attribute.property("BearerFormat")))
                .field("http_scheme", json_text(attribute.property("Scheme"))),
        ),
        "OpenApiOperation" => {
            let tags = attribute
                .ctor_arg(1, "tags")
                .or_else(|| attribute.property("Tags"))
                .map(ArgValue::to_json)
                .unwrap_or(Value::Null);
            entries.push(
                AnnotationEntry::new("operation")
                    .field("tags", tags)
                    .field("summary", json_text(attribute.property("Summary")))
                    .field("description", json_text(attribute.property("Description"))),
            );
        }
        "OpenApiParameter" => {
            let name = json_text(attribute.ctor_arg(0, "name"));
            let mut entry = AnnotationEntry::new("parameter")
                .field("name", name.clone())
                .field(
                    "in",
                    attribute
                        .property("In")
                        .and_then(ArgValue::text)
                        .unwrap_or_else(|| "path".to_string()),
                )
                .field("type", json_text(attribute.property("Type")))
                .field("description", json_text(attribute.property("Description")));
            if let Some(required) = attribute.property("Required") {
                entry = entry.field("required", required.to_json());
            }
            entries.push(with_example(entry, attribute));
            declare_example(attribute, "parameter", name, entries, declared_examples);
        }
        "OpenApiRequestBody" => {
            let mut entry = AnnotationEntry::new("request_body")
                .field("content_type", json_text(attribute.ctor_arg(0, "contentType")))
                .field("type", json_text(attribute.ctor_arg(1, "bodyType")))
                .field("description", json_text(attribute.property("Description")));
            if let Some(required) = attribute.property("Required") {
                entry = entry.field("required", required.to_json());
            }
            entries.push(with_example(entry, attribute));
            declare_example(attribute, "parameter", Value::from("body"), entries, declared_examples);
        }
        "OpenApiResponseWithBody" | "OpenApiResponseWithoutBody" => {
            let status = attribute
                .ctor_arg(0, "statusCode")
                .map(ArgValue::to_json)
                .unwrap_or(Value::Null);
            let mut entry = AnnotationEntry::new("response")
                .field("status", status.clone())
                .field("description", json_text(attribute.property("Description")));
            if attribute.name == "OpenApiResponseWithBody" {
                entry = entry
                    .field("content_type", json_text(attribute.ctor_arg(1, "contentType")))
                    .field("body_type", json_text(attribute.ctor_arg(2, "bodyType")));
            }
            entries.push(with_example(entry, attribute));
            declare_example(attribute, "response", status, entries, declared_examples);
        }
        name if name.len() > "Require".len() && name.starts_with("Require") => {
            entries.push(security_requirement(attribute));
        }
        _ => entries.push(passthrough(attribute)),
    }
}

/// `[RequireDocsTokenGroups("admins")]` -> scheme `DocsToken`, groups `[admins]`.
fn security_requirement(attribute: &Attribute) -> AnnotationEntry {
    let scheme = &attribute.name["Require".len()..];
    let scheme = scheme
        .strip_suffix("Groups")
        .filter(|s| !s.is_empty())
        .unwrap_or(scheme);

    let mut groups = Vec::new();
    let mut operation_type = None;
    for value in attribute.ctor_args() {
        match value {
            ArgValue::Symbol(_) if value.qualified().is_some_and(|(q, _)| q.ends_with("OperationType")) => {
                operation_type = value.text();
            }
            ArgValue::List(items) => groups.extend(items.iter().filter_map(ArgValue::text)),
            other => groups.extend(other.text()),
        }
    }

    let mut entry = AnnotationEntry::new("security").field("scheme", scheme);
    if !groups.is_empty() {
        entry = entry.field("groups", groups);
    }
    if let Some(operation_type) = operation_type {
        entry = entry.field("operation_type", operation_type);
    }
    entry
}

/// Unrecognized attributes keep their arguments as fields.
fn passthrough(attribute: &Attribute) -> AnnotationEntry {
    let mut entry = AnnotationEntry::new(&attribute.name);
    for (i, arg) in attribute.args.iter().enumerate() {
        let key = arg.name.clone().unwrap_or_else(|| i.to_string());
        entry = entry.field(key, arg.value.to_json());
    }
    entry
}

fn with_example(entry: AnnotationEntry, attribute: &Attribute) -> AnnotationEntry {
    match attribute.property("Example").and_then(ArgValue::text) {
        Some(example) => entry.field("example", example),
        None => entry,
    }
}

/// An inline `Example = typeof(E)` also declares `E`, bound to its owner.
fn declare_example(
    attribute: &Attribute,
    target_field: &str,
    target: Value,
    entries: &mut Vec<AnnotationEntry>,
    declared: &mut HashSet<String>,
) {
    let Some(id) = attribute.property("Example").and_then(ArgValue::text) else {
        return;
    };
    if declared.insert(id.clone()) {
        entries.push(
            AnnotationEntry::new("example")
                .field("id", id)
                .field(target_field, target),
        );
    }
}

fn json_text(value: Option<&ArgValue>) -> Value {
    value
        .and_then(ArgValue::text)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// Split a parameter list into signature params plus any parameter attributes.
pub(crate) fn parse_signature(params: &str) -> (Vec<SignatureParam>, Vec<Attribute>) {
    let mut signature = Vec::new();
    let mut attributes = Vec::new();

    for param in split_top_level(params, b',') {
        let mut rest = param.trim();
        while rest.starts_with('[') {
            let Some((inner, end)) = super::attribute::read_balanced(rest, 0) else {
                break;
            };
            attributes.extend(Attribute::parse_block(inner));
            rest = rest[end..].trim_start();
        }

        // Drop a default value.
        if let Some(declaration) = split_top_level(rest, b'=').first().copied() {
            rest = declaration;
        }

        let mut words: Vec<&str> = rest.split_whitespace().collect();
        while words.len() > 2 && PARAM_MODIFIERS.contains(&words[0]) {
            words.remove(0);
        }
        let Some((name, type_words)) = words.split_last() else {
            continue;
        };
        if type_words.is_empty() {
            continue;
        }

        signature.push(SignatureParam {
            name: name.to_string(),
            type_name: type_words.join(" "),
        });
    }

    (signature, attributes)
}
