use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The tokenized view of one handler definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerUnit {
    /// Declared operation name.
    pub name: String,
    /// Annotation entries in declaration order.
    #[serde(default)]
    pub annotations: Vec<AnnotationEntry>,
    /// Parameters bound by the handler signature, in order.
    #[serde(default)]
    pub signature: Vec<SignatureParam>,
    /// Where the unit came from (e.g. "HttpTriggers.cs:12").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl HandlerUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            signature: Vec::new(),
            origin: None,
        }
    }

    /// Append an annotation entry.
    pub fn with_annotation(mut self, entry: AnnotationEntry) -> Self {
        self.annotations.push(entry);
        self
    }

    /// Append a signature parameter.
    pub fn with_param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.signature.push(SignatureParam {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// One annotation: a variant tag plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub tag: String,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl AnnotationEntry {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A parameter declared by the handler signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// HTTP verbs accepted in route bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpVerb {
    /// Parse a verb, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match last_segment(s).to_lowercase().as_str() {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization level declared on the route binding itself.
///
/// Anything other than `Anonymous` means the host rejects callers that do
/// not present a key or identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationLevel {
    #[default]
    Anonymous,
    User,
    Function,
    System,
    Admin,
}

impl AuthorizationLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match last_segment(s).to_lowercase().as_str() {
            "anonymous" => Some(Self::Anonymous),
            "user" => Some(Self::User),
            "function" => Some(Self::Function),
            "system" => Some(Self::System),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::User => "user",
            Self::Function => "function",
            Self::System => "system",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a security scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    #[default]
    Http,
    ApiKey,
    #[serde(rename = "oauth2")]
    OAuth2,
    OpenIdConnect,
}

impl SchemeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match last_segment(s).to_lowercase().replace(['_', '-'], "").as_str() {
            "http" => Some(Self::Http),
            "apikey" => Some(Self::ApiKey),
            "oauth2" => Some(Self::OAuth2),
            "openidconnect" => Some(Self::OpenIdConnect),
            _ => None,
        }
    }
}

/// Binds an operation to a verb and path template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBinding {
    pub verb: HttpVerb,
    /// Path template as declared (e.g. "sandbox/{moduleId}/info").
    pub path: String,
    #[serde(default)]
    pub authorization: AuthorizationLevel,
}

/// The authentication/authorization scheme an operation demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirement {
    /// Scheme name (e.g. "DocsToken").
    pub scheme: String,
    #[serde(default)]
    pub kind: SchemeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    /// HTTP auth scheme (e.g. "Bearer").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_scheme: Option<String>,
    /// Groups or claims the principal must hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Audit operation type (e.g. "Read", "Create").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
}

/// A documented parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Referenced example identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// Media type, for body parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A documented response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    /// Referenced example identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// What a declared example is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleTarget {
    Response(u16),
    Parameter(String),
}

/// Declares an example identifier, optionally bound to a response or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleBinding {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ExampleTarget>,
}

/// A typed annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationRecord {
    RouteBinding(RouteBinding),
    SecurityRequirement(SecurityRequirement),
    ParameterDescriptor(ParameterDescriptor),
    ResponseDescriptor(ResponseDescriptor),
    ExampleBinding(ExampleBinding),
}

/// Parser output for one handler unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUnit {
    pub name: String,
    /// Grouping tags for documentation clustering.
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub records: Vec<AnnotationRecord>,
    pub signature: Vec<SignatureParam>,
    pub origin: Option<String>,
}

/// `ParameterLocation.Query` -> `Query`.
pub(crate) fn last_segment(s: &str) -> &str {
    let s = s.trim();
    s.rsplit('.').next().unwrap_or(s)
}
