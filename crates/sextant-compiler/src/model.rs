use std::collections::{BTreeMap, HashMap};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use sextant_router::{RouteEntry, RouteKey, RouteMatch, Router};

use crate::descriptor::OperationDescriptor;
use crate::error::ExtractError;
use crate::validator::{Finding, FindingCode, Severity};

/// Current JSON export format version.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Generator stamp written into exports.
const GENERATOR: &str = concat!("sextant ", env!("CARGO_PKG_VERSION"));

/// The validated, indexed, read-only set of operations.
#[derive(Debug, Default)]
pub struct EndpointModel {
    operations: Vec<OperationDescriptor>,
    index: BTreeMap<RouteKey, String>,
    by_name: HashMap<String, usize>,
    router: Router,
}

/// One route index entry, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteIndexEntry {
    pub verb: String,
    pub path: String,
    pub operation: String,
}

impl EndpointModel {
    /// Index operations by name and route. Colliding routes stay in the model
    /// but only the first one is indexed; each later one yields a finding.
    pub(crate) fn index(operations: Vec<OperationDescriptor>) -> (Self, Vec<Finding>) {
        let mut model = Self::default();
        let mut findings = Vec::new();

        for (i, op) in operations.iter().enumerate() {
            model.by_name.entry(op.name.clone()).or_insert(i);

            let key = op.route_key();
            let entry = RouteEntry { operation_index: i };
            match model.router.insert(&op.route.path, &key.verb, entry) {
                Ok(()) => {
                    model.index.insert(key, op.name.clone());
                }
                Err(existing) => {
                    let first = &operations[existing.operation_index];
                    findings.push(Finding::new(
                        FindingCode::DuplicateRoute,
                        op,
                        format!(
                            "{} {} collides with '{}' ({} {})",
                            key.verb, op.route.path, first.name, first.route.verb, first.route.path
                        ),
                    ));
                }
            }
        }

        model.operations = operations;
        (model, findings)
    }

    /// All operations in source order.
    pub fn all(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&OperationDescriptor> {
        self.by_name.get(name).map(|&i| &self.operations[i])
    }

    /// Find the operation serving `verb` on `path`.
    ///
    /// `path` may be a template (`/sandbox/{id}`) or a concrete request path
    /// (`/sandbox/az-204`). Literal segments beat placeholders.
    pub fn find_by_route(&self, verb: &str, path: &str) -> Option<&OperationDescriptor> {
        match self.router.lookup(path, verb) {
            RouteMatch::Found { entry, .. } => self.operations.get(entry.operation_index),
            _ => None,
        }
    }

    /// Full route lookup, including captured parameters and allowed verbs.
    pub fn lookup(&self, verb: &str, path: &str) -> RouteMatch {
        self.router.lookup(path, verb)
    }

    /// Operations requiring the named security scheme, alone or stacked
    /// with others.
    pub fn find_by_scheme(&self, scheme: &str) -> Vec<&OperationDescriptor> {
        self.operations
            .iter()
            .filter(|op| op.security.requirement(scheme).is_some())
            .collect()
    }

    /// Operations without a security requirement.
    pub fn anonymous(&self) -> Vec<&OperationDescriptor> {
        self.operations.iter().filter(|op| op.is_anonymous()).collect()
    }

    /// (verb, structural path) -> operation name.
    pub fn route_index(&self) -> &BTreeMap<RouteKey, String> {
        &self.index
    }

    fn route_entries(&self) -> Vec<RouteIndexEntry> {
        self.index
            .iter()
            .map(|(key, operation)| RouteIndexEntry {
                verb: key.verb.clone(),
                path: key.path.clone(),
                operation: operation.clone(),
            })
            .collect()
    }
}

impl Serialize for EndpointModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("EndpointModel", 2)?;
        state.serialize_field("operations", &self.operations)?;
        state.serialize_field("route_index", &self.route_entries())?;
        state.end()
    }
}

/// Everything one extraction run produced.
#[derive(Debug, Default)]
pub struct Extraction {
    pub model: EndpointModel,
    /// Validation findings, ordered by check then operation.
    pub findings: Vec<Finding>,
    /// Fatal per-unit errors, in source order. The affected units are absent
    /// from the model.
    pub errors: Vec<ExtractError>,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    format_version: u32,
    generator: &'static str,
    fingerprint: String,
    model: &'a EndpointModel,
    findings: &'a [Finding],
    errors: &'a [ExtractError],
}

impl Extraction {
    pub fn findings_by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    /// True when any unit failed or any Error-severity finding exists.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// `sha256:<hex>` of the model's canonical JSON.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(&self.model)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    fn document(&self) -> Result<ExportDocument<'_>, serde_json::Error> {
        Ok(ExportDocument {
            format_version: EXPORT_FORMAT_VERSION,
            generator: GENERATOR,
            fingerprint: self.fingerprint()?,
            model: &self.model,
            findings: &self.findings,
            errors: &self.errors,
        })
    }

    /// Compact JSON export of the model, findings and errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.document()?)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document()?)
    }
}
