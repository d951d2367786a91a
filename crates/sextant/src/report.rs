//! Rendering extraction results for the `validate` and `lookup` commands.

use std::fmt::Write as _;

use serde::Serialize;

use sextant_compiler::{ExtractError, Extraction, Finding, OperationDescriptor, Severity};

/// Validation outcome for one run, as printed by `validate --format json`.
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub valid: bool,
    pub summary: Summary,
    pub errors: &'a [ExtractError],
    pub findings: Vec<ReportedFinding<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub units: usize,
    pub operations: usize,
    pub excluded: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// A finding plus its id and the origin of the operation it concerns.
#[derive(Debug, Serialize)]
pub struct ReportedFinding<'a> {
    /// Stable finding id (E2101–E2106).
    pub id: &'static str,
    #[serde(flatten)]
    pub finding: &'a Finding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<&'a str>,
}

impl<'a> ValidationReport<'a> {
    /// `warnings_as_errors` makes any finding invalidate the run.
    pub fn new(extraction: &'a Extraction, units: usize, warnings_as_errors: bool) -> Self {
        let errors = extraction.findings_by_severity(Severity::Error).len();
        let warnings = extraction.findings_by_severity(Severity::Warning).len();

        let valid = !extraction.has_errors() && !(warnings_as_errors && warnings > 0);

        let findings = extraction
            .findings
            .iter()
            .map(|finding| ReportedFinding {
                id: finding.code.id(),
                finding,
                origin: extraction
                    .model
                    .find_by_name(&finding.operation)
                    .and_then(|op| op.origin.as_deref()),
            })
            .collect();

        Self {
            valid,
            summary: Summary {
                units,
                operations: extraction.model.len(),
                excluded: extraction.errors.len(),
                errors,
                warnings,
            },
            errors: &extraction.errors,
            findings,
        }
    }

    /// Human-readable report.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let summary = &self.summary;

        if self.valid && summary.warnings == 0 {
            let _ = writeln!(out, "✓ endpoint model is valid");
        } else if self.valid {
            let _ = writeln!(
                out,
                "✓ endpoint model is valid (with {} warning(s))",
                summary.warnings
            );
        } else {
            let _ = writeln!(
                out,
                "✗ endpoint model has {} error(s)",
                summary.excluded + summary.errors
            );
        }

        for err in self.errors {
            let _ = writeln!(out, "  {err}");
        }
        for reported in &self.findings {
            match reported.origin {
                Some(origin) => {
                    let _ = writeln!(out, "  {} [{}]", reported.finding, origin);
                }
                None => {
                    let _ = writeln!(out, "  {}", reported.finding);
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "validated {} unit(s): {} operation(s), {} excluded, {} error finding(s), {} warning(s)",
            summary.units, summary.operations, summary.excluded, summary.errors, summary.warnings
        );
        out
    }
}

/// Result of a `lookup`, as printed by `lookup --format json`.
#[derive(Debug, Serialize)]
pub struct LookupReport<'a> {
    pub operation: &'a OperationDescriptor,
    /// Values captured from a concrete request path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<(String, String)>,
}

impl LookupReport<'_> {
    pub fn to_text(&self) -> String {
        let op = self.operation;
        let mut out = String::new();

        let _ = writeln!(out, "{} {} {}", op.name, op.route.verb, op.route.path);
        if let Some(origin) = &op.origin {
            let _ = writeln!(out, "  origin: {origin}");
        }
        if let Some(summary) = &op.summary {
            let _ = writeln!(out, "  summary: {summary}");
        }
        if op.is_anonymous() {
            let _ = writeln!(out, "  security: anonymous");
        }
        for requirement in op.security.requirements() {
            let _ = write!(out, "  security: {}", requirement.scheme);
            if let Some(operation_type) = &requirement.operation_type {
                let _ = write!(out, " ({operation_type})");
            }
            if !requirement.groups.is_empty() {
                let _ = write!(out, " groups: {}", requirement.groups.join(", "));
            }
            let _ = writeln!(out);
        }
        for param in &op.parameters {
            let _ = writeln!(
                out,
                "  parameter: {} in {}{}",
                param.name,
                param.location,
                if param.required { " (required)" } else { "" }
            );
        }
        for response in &op.responses {
            let _ = writeln!(
                out,
                "  response: {}{}",
                response.status,
                response
                    .body_type
                    .as_deref()
                    .map(|t| format!(" {t}"))
                    .unwrap_or_default()
            );
        }
        for (name, value) in &self.params {
            let _ = writeln!(out, "  captured: {name} = {value}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_compiler::{extract, AnnotationEntry, ExtractOptions, HandlerUnit};

    fn extraction() -> Extraction {
        let units = vec![
            HandlerUnit::new("GetAsync")
                .with_annotation(
                    AnnotationEntry::new("route")
                        .field("verb", "get")
                        .field("path", "sandbox/{moduleId}"),
                )
                .with_annotation(AnnotationEntry::new("security").field("scheme", "DocsToken"))
                .with_annotation(AnnotationEntry::new("security").field("scheme", "S2SToken"))
                .with_annotation(
                    AnnotationEntry::new("parameter")
                        .field("name", "moduleId")
                        .field("in", "path"),
                )
                .with_origin("HttpTriggers.cs:36"),
            HandlerUnit::new("Helper"),
        ];
        extract(&units, &ExtractOptions::new().with_parallelism(1))
    }

    #[test]
    fn report_counts_and_validity() {
        let extraction = extraction();
        let report = ValidationReport::new(&extraction, 2, false);

        assert!(!report.valid);
        assert_eq!(
            report.summary,
            Summary {
                units: 2,
                operations: 1,
                excluded: 1,
                errors: 0,
                warnings: 1,
            }
        );
        assert_eq!(report.findings[0].origin, Some("HttpTriggers.cs:36"));
    }

    #[test]
    fn warnings_as_errors_invalidates() {
        let units = vec![HandlerUnit::new("A")
            .with_annotation(AnnotationEntry::new("route").field("verb", "get").field("path", "a"))
            .with_annotation(AnnotationEntry::new("security").field("scheme", "DocsToken"))];
        let extraction = extract(&units, &ExtractOptions::default());

        assert!(ValidationReport::new(&extraction, 1, false).valid);
        assert!(!ValidationReport::new(&extraction, 1, true).valid);
    }

    #[test]
    fn text_report_lists_errors_and_findings() {
        let extraction = extraction();
        let text = ValidationReport::new(&extraction, 2, false).to_text();

        assert!(text.starts_with("✗ endpoint model has 1 error(s)"));
        assert!(text.contains("E2020: operation 'Helper' has no route binding"));
        assert!(text.contains("warning[E2105] GetAsync:"));
        assert!(text.contains("[HttpTriggers.cs:36]"));
        assert!(text.contains("validated 2 unit(s): 1 operation(s), 1 excluded"));
    }

    #[test]
    fn json_report_flattens_findings() {
        let extraction = extraction();
        let json = serde_json::to_value(ValidationReport::new(&extraction, 2, false)).unwrap();

        assert_eq!(json["valid"], false);
        assert_eq!(json["summary"]["operations"], 1);
        assert_eq!(json["errors"][0]["code"], "E2020");
        assert_eq!(json["findings"][0]["id"], "E2105");
        assert_eq!(json["findings"][0]["code"], "MissingUnauthorizedResponse");
        assert_eq!(json["findings"][0]["severity"], "warning");
        assert_eq!(json["findings"][0]["operation"], "GetAsync");
    }

    #[test]
    fn lookup_text() {
        let extraction = extraction();
        let report = LookupReport {
            operation: extraction.model.find_by_name("GetAsync").unwrap(),
            params: vec![("moduleId".to_string(), "az-204".to_string())],
        };
        let text = report.to_text();

        assert!(text.starts_with("GetAsync GET sandbox/{moduleId}"));
        assert!(text.contains("security: DocsToken\n  security: S2SToken\n"));
        assert!(!text.contains("anonymous"));
        assert!(text.contains("parameter: moduleId in path (required)"));
        assert!(text.contains("captured: moduleId = az-204"));
    }
}
