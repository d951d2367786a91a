use std::fmt;

use serde::{Deserialize, Serialize};

use sextant_parser::{ExampleTarget, ParameterLocation};
use sextant_router::placeholders;

use crate::descriptor::{OperationDescriptor, Security};
use crate::model::EndpointModel;

/// Options for model validation.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Status a secured operation is expected to document (default: 401).
    pub unauthorized_status: u16,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            unauthorized_status: 401,
        }
    }
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unauthorized_status(mut self, status: u16) -> Self {
        self.unauthorized_status = status;
        self
    }
}

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// Validation checks, in the order they run (E2101–E2106).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingCode {
    DuplicateRoute,
    UnboundPathParameter,
    ImplicitAnonymousAccess,
    DanglingExampleReference,
    MissingUnauthorizedResponse,
    UnusedPathParameter,
}

impl FindingCode {
    pub fn id(&self) -> &'static str {
        match self {
            Self::DuplicateRoute => "E2101",
            Self::UnboundPathParameter => "E2102",
            Self::ImplicitAnonymousAccess => "E2103",
            Self::DanglingExampleReference => "E2104",
            Self::MissingUnauthorizedResponse => "E2105",
            Self::UnusedPathParameter => "E2106",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateRoute | Self::UnboundPathParameter | Self::DanglingExampleReference => {
                Severity::Error
            }
            Self::ImplicitAnonymousAccess
            | Self::MissingUnauthorizedResponse
            | Self::UnusedPathParameter => Severity::Warning,
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A non-fatal validation result attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
    pub operation: String,
}

impl Finding {
    pub(crate) fn new(code: FindingCode, operation: &OperationDescriptor, message: String) -> Self {
        Self {
            severity: code.severity(),
            code,
            message,
            operation: operation.name.clone(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity,
            self.code.id(),
            self.operation,
            self.message
        )
    }
}

/// Run every check over the operations and index them.
///
/// Findings are ordered by check, then by operation order. Operations are
/// never dropped; a route collision keeps the first operation in the index.
pub fn validate(
    operations: Vec<OperationDescriptor>,
    context: &ValidationContext,
) -> (EndpointModel, Vec<Finding>) {
    let (model, mut findings) = EndpointModel::index(operations);
    let operations = model.all();

    findings.extend(operations.iter().flat_map(check_unbound_path_parameters));
    findings.extend(operations.iter().filter_map(check_implicit_anonymous_access));
    findings.extend(operations.iter().flat_map(check_dangling_examples));
    findings.extend(
        operations
            .iter()
            .filter_map(|op| check_unauthorized_response(op, context)),
    );
    findings.extend(operations.iter().flat_map(check_unused_path_parameters));

    tracing::debug!(
        operations = operations.len(),
        findings = findings.len(),
        "validated endpoint model"
    );

    (model, findings)
}

fn check_unbound_path_parameters(op: &OperationDescriptor) -> Vec<Finding> {
    placeholders(&op.route.path)
        .into_iter()
        .filter(|p| op.parameter(&p.name, ParameterLocation::Path).is_none())
        .map(|p| {
            let message = match op.signature_param(&p.name) {
                Some(param) => format!(
                    "placeholder '{{{}}}' in '{}' has no path parameter (bound by the handler signature as {})",
                    p.name, op.route.path, param.type_name
                ),
                None => format!(
                    "placeholder '{{{}}}' in '{}' has no path parameter",
                    p.name, op.route.path
                ),
            };
            Finding::new(FindingCode::UnboundPathParameter, op, message)
        })
        .collect()
}

fn check_implicit_anonymous_access(op: &OperationDescriptor) -> Option<Finding> {
    (op.route.authorization.is_protected() && op.is_anonymous()).then(|| {
        Finding::new(
            FindingCode::ImplicitAnonymousAccess,
            op,
            format!(
                "route requires {} authorization but declares no security requirement",
                op.route.authorization
            ),
        )
    })
}

fn check_dangling_examples(op: &OperationDescriptor) -> Vec<Finding> {
    let mut findings = Vec::new();

    for response in &op.responses {
        if let Some(id) = &response.example {
            if !op.declares_example(id) {
                findings.push(Finding::new(
                    FindingCode::DanglingExampleReference,
                    op,
                    format!("response {} references undeclared example '{}'", response.status, id),
                ));
            }
        }
    }
    for param in &op.parameters {
        if let Some(id) = &param.example {
            if !op.declares_example(id) {
                findings.push(Finding::new(
                    FindingCode::DanglingExampleReference,
                    op,
                    format!(
                        "{} parameter '{}' references undeclared example '{}'",
                        param.location, param.name, id
                    ),
                ));
            }
        }
    }
    for example in &op.examples {
        let missing = match &example.target {
            Some(ExampleTarget::Response(status)) if op.response(*status).is_none() => {
                Some(format!("response {status}"))
            }
            Some(ExampleTarget::Parameter(name)) if !op.parameters.iter().any(|p| &p.name == name) => {
                Some(format!("parameter '{name}'"))
            }
            _ => None,
        };
        if let Some(target) = missing {
            findings.push(Finding::new(
                FindingCode::DanglingExampleReference,
                op,
                format!("example '{}' targets undeclared {}", example.id, target),
            ));
        }
    }

    findings
}

fn check_unauthorized_response(op: &OperationDescriptor, context: &ValidationContext) -> Option<Finding> {
    let Security::Required { requirements } = &op.security else {
        return None;
    };
    op.response(context.unauthorized_status).is_none().then(|| {
        let schemes: Vec<&str> = requirements.iter().map(|r| r.scheme.as_str()).collect();
        Finding::new(
            FindingCode::MissingUnauthorizedResponse,
            op,
            format!(
                "requires '{}' but documents no {} response",
                schemes.join("' and '"),
                context.unauthorized_status
            ),
        )
    })
}

fn check_unused_path_parameters(op: &OperationDescriptor) -> Vec<Finding> {
    let names: Vec<String> = placeholders(&op.route.path)
        .into_iter()
        .map(|p| p.name)
        .collect();
    op.path_parameters()
        .filter(|p| !names.contains(&p.name))
        .map(|p| {
            Finding::new(
                FindingCode::UnusedPathParameter,
                op,
                format!(
                    "path parameter '{}' does not appear in '{}'",
                    p.name, op.route.path
                ),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_parser::{
        AuthorizationLevel, ExampleBinding, HttpVerb, ParameterDescriptor, ResponseDescriptor,
        RouteBinding, SchemeKind, SecurityRequirement, SignatureParam,
    };

    fn op(name: &str, verb: HttpVerb, path: &str) -> OperationDescriptor {
        OperationDescriptor {
            name: name.to_string(),
            route: RouteBinding {
                verb,
                path: path.to_string(),
                authorization: AuthorizationLevel::Anonymous,
            },
            parameters: Vec::new(),
            responses: Vec::new(),
            security: Security::Anonymous,
            tags: Vec::new(),
            summary: None,
            description: None,
            examples: Vec::new(),
            signature: Vec::new(),
            origin: None,
        }
    }

    fn path_param(name: &str) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            location: ParameterLocation::Path,
            required: true,
            type_name: None,
            description: None,
            example: None,
            content_type: None,
        }
    }

    fn response(status: u16, example: Option<&str>) -> ResponseDescriptor {
        ResponseDescriptor {
            status,
            description: None,
            content_type: None,
            body_type: None,
            example: example.map(str::to_string),
        }
    }

    fn secured(mut op: OperationDescriptor) -> OperationDescriptor {
        op.security = Security::Required {
            requirements: vec![SecurityRequirement {
                scheme: "DocsToken".to_string(),
                kind: SchemeKind::Http,
                bearer_format: None,
                http_scheme: None,
                groups: Vec::new(),
                operation_type: None,
            }],
        };
        op
    }

    fn codes(findings: &[Finding]) -> Vec<FindingCode> {
        findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn clean_anonymous_operation_has_no_findings() {
        let (model, findings) = validate(
            vec![op("VerifyModules", HttpVerb::Get, "sandbox/verify")],
            &ValidationContext::default(),
        );
        assert!(findings.is_empty());
        assert_eq!(model.all().len(), 1);
    }

    #[test]
    fn duplicate_route_keeps_both_operations() {
        let mut first = op("A", HttpVerb::Get, "/sandbox/{moduleId}");
        first.parameters.push(path_param("moduleId"));
        let mut second = op("B", HttpVerb::Get, "/Sandbox/{id}/");
        second.parameters.push(path_param("id"));

        let (model, findings) = validate(vec![first, second], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::DuplicateRoute]);
        assert_eq!(findings[0].operation, "B");
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(model.all().len(), 2);
        assert_eq!(
            model.find_by_route("GET", "/sandbox/{x}").map(|o| o.name.as_str()),
            Some("A")
        );
    }

    #[test]
    fn unbound_placeholder_is_reported_and_cleared() {
        let mut unbound = op("GetInitialInfoAsync", HttpVerb::Get, "sandbox/{moduleId}/info");
        unbound.signature.push(SignatureParam {
            name: "moduleId".to_string(),
            type_name: "string".to_string(),
        });

        let (_, findings) = validate(vec![unbound.clone()], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::UnboundPathParameter]);
        assert!(findings[0].message.contains("as string"));

        unbound.parameters.push(path_param("moduleId"));
        let (_, findings) = validate(vec![unbound], &ValidationContext::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn placeholder_names_match_case_sensitively() {
        let mut operation = op("A", HttpVerb::Get, "items/{id}");
        operation.parameters.push(path_param("ID"));
        let (_, findings) = validate(vec![operation], &ValidationContext::default());
        assert_eq!(
            codes(&findings),
            vec![FindingCode::UnboundPathParameter, FindingCode::UnusedPathParameter]
        );
    }

    #[test]
    fn protected_route_without_security() {
        let mut operation = op("A", HttpVerb::Get, "a");
        operation.route.authorization = AuthorizationLevel::Function;
        let (_, findings) = validate(vec![operation], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::ImplicitAnonymousAccess]);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].message.contains("function"));
    }

    #[test]
    fn dangling_example_references_both_directions() {
        let mut operation = op("A", HttpVerb::Get, "a");
        operation.responses.push(response(200, Some("X")));

        let (_, findings) = validate(vec![operation.clone()], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::DanglingExampleReference]);

        operation.examples.push(ExampleBinding {
            id: "X".to_string(),
            target: Some(ExampleTarget::Response(200)),
        });
        let (_, findings) = validate(vec![operation.clone()], &ValidationContext::default());
        assert!(findings.is_empty());

        operation.examples.push(ExampleBinding {
            id: "Y".to_string(),
            target: Some(ExampleTarget::Parameter("body".to_string())),
        });
        let (_, findings) = validate(vec![operation], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::DanglingExampleReference]);
        assert!(findings[0].message.contains("parameter 'body'"));
    }

    #[test]
    fn secured_operation_needs_unauthorized_response() {
        let operation = secured(op("A", HttpVerb::Get, "a"));
        let (_, findings) = validate(vec![operation.clone()], &ValidationContext::default());
        assert_eq!(codes(&findings), vec![FindingCode::MissingUnauthorizedResponse]);

        let mut documented = operation.clone();
        documented.responses.push(response(401, None));
        let (_, findings) = validate(vec![documented], &ValidationContext::default());
        assert!(findings.is_empty());

        // A 403 does not satisfy the check unless configured.
        let mut forbidden = operation;
        forbidden.responses.push(response(403, None));
        let (_, findings) = validate(vec![forbidden.clone()], &ValidationContext::default());
        assert_eq!(findings.len(), 1);
        let context = ValidationContext::new().with_unauthorized_status(403);
        let (_, findings) = validate(vec![forbidden], &context);
        assert!(findings.is_empty());
    }

    #[test]
    fn findings_are_ordered_by_check_then_operation() {
        let mut a = secured(op("A", HttpVerb::Get, "a/{id}"));
        a.route.authorization = AuthorizationLevel::Function;
        let b = op("B", HttpVerb::Get, "b/{id}");
        let c = op("C", HttpVerb::Get, "A/{x}");

        let (_, findings) = validate(vec![a, b, c], &ValidationContext::default());
        let summary: Vec<(FindingCode, &str)> = findings
            .iter()
            .map(|f| (f.code, f.operation.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (FindingCode::DuplicateRoute, "C"),
                (FindingCode::UnboundPathParameter, "A"),
                (FindingCode::UnboundPathParameter, "B"),
                (FindingCode::UnboundPathParameter, "C"),
                (FindingCode::MissingUnauthorizedResponse, "A"),
            ]
        );
    }

    #[test]
    fn finding_display() {
        let finding = Finding {
            severity: Severity::Error,
            code: FindingCode::DuplicateRoute,
            message: "GET /a is already bound to 'X'".to_string(),
            operation: "Y".to_string(),
        };
        assert_eq!(
            finding.to_string(),
            "error[E2101] Y: GET /a is already bound to 'X'"
        );
        assert_eq!(FindingCode::UnusedPathParameter.to_string(), "UnusedPathParameter");
    }
}
