use serde::{Deserialize, Serialize};

use sextant_parser::{
    ExampleBinding, ParameterDescriptor, ParameterLocation, ResponseDescriptor, RouteBinding,
    SecurityRequirement, SignatureParam,
};
use sextant_router::RouteKey;

/// The security an operation demands.
///
/// A handler may stack several schemes (`[RequireDocsToken] [RequireS2SToken]`);
/// each scheme appears once, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Security {
    #[default]
    Anonymous,
    Required { requirements: Vec<SecurityRequirement> },
}

impl Security {
    /// Required schemes; empty when anonymous.
    pub fn requirements(&self) -> &[SecurityRequirement] {
        match self {
            Self::Anonymous => &[],
            Self::Required { requirements } => requirements,
        }
    }

    /// The requirement for `scheme` (case-insensitive), if demanded.
    pub fn requirement(&self, scheme: &str) -> Option<&SecurityRequirement> {
        self.requirements()
            .iter()
            .find(|r| r.scheme.eq_ignore_ascii_case(scheme))
    }
}

/// One API operation, backed by one handler and bound to exactly one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Unique operation name.
    pub name: String,
    pub route: RouteBinding,
    /// Parameters in declaration order. (name, location) is unique.
    pub parameters: Vec<ParameterDescriptor>,
    /// Responses in declaration order. Status codes are unique.
    pub responses: Vec<ResponseDescriptor>,
    pub security: Security,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared example bindings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<SignatureParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl OperationDescriptor {
    /// Index key: uppercase verb plus structural path.
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(self.route.verb.as_str(), &self.route.path)
    }

    pub fn response(&self, status: u16) -> Option<&ResponseDescriptor> {
        self.responses.iter().find(|r| r.status == status)
    }

    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.name == name)
    }

    /// Path-located parameters.
    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.security, Security::Anonymous)
    }

    /// Whether an example id is declared by this operation.
    pub fn declares_example(&self, id: &str) -> bool {
        self.examples.iter().any(|e| e.id == id)
    }

    /// Signature parameter bound to `name`, if any.
    pub fn signature_param(&self, name: &str) -> Option<&SignatureParam> {
        self.signature.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_parser::{AuthorizationLevel, HttpVerb, SchemeKind};

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor {
            name: "GetAsync".to_string(),
            route: RouteBinding {
                verb: HttpVerb::Get,
                path: "/Sandbox/{moduleId}".to_string(),
                authorization: AuthorizationLevel::Anonymous,
            },
            parameters: vec![ParameterDescriptor {
                name: "moduleId".to_string(),
                location: ParameterLocation::Path,
                required: true,
                type_name: Some("string".to_string()),
                description: None,
                example: None,
                content_type: None,
            }],
            responses: vec![ResponseDescriptor {
                status: 401,
                description: Some("Authorization required".to_string()),
                content_type: None,
                body_type: None,
                example: None,
            }],
            security: Security::Required {
                requirements: vec![SecurityRequirement {
                    scheme: "DocsToken".to_string(),
                    kind: SchemeKind::Http,
                    bearer_format: None,
                    http_scheme: Some("Bearer".to_string()),
                    groups: Vec::new(),
                    operation_type: Some("Read".to_string()),
                }],
            },
            tags: Vec::new(),
            summary: None,
            description: None,
            examples: Vec::new(),
            signature: Vec::new(),
            origin: None,
        }
    }

    #[test]
    fn accessors() {
        let op = descriptor();
        assert_eq!(op.route_key().to_string(), "GET /sandbox/{}");
        assert!(op.response(401).is_some());
        assert!(op.response(200).is_none());
        assert!(op.parameter("moduleId", ParameterLocation::Path).is_some());
        assert!(op.parameter("moduleId", ParameterLocation::Query).is_none());
        assert_eq!(op.path_parameters().count(), 1);
        assert!(!op.is_anonymous());
        assert!(op.security.requirement("docstoken").is_some());
        assert!(op.security.requirement("S2SToken").is_none());
        assert!(Security::Anonymous.requirements().is_empty());
    }

    #[test]
    fn security_serializes_with_type_tag() {
        let json = serde_json::to_value(descriptor().security).unwrap();
        assert_eq!(json["type"], "required");
        assert_eq!(json["requirements"][0]["scheme"], "DocsToken");
        assert_eq!(json["requirements"][0]["operation_type"], "Read");

        let json = serde_json::to_value(Security::Anonymous).unwrap();
        assert_eq!(json, serde_json::json!({"type": "anonymous"}));
    }
}
