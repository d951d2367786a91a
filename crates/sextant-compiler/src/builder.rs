use std::collections::HashSet;

use sextant_parser::{AnnotationRecord, ParsedUnit, SecurityRequirement};

use crate::descriptor::{OperationDescriptor, Security};
use crate::error::BuildError;

/// Group a parsed unit's records into one operation descriptor.
///
/// Security requirements naming the same scheme merge: groups are unioned
/// and the first non-empty optional value wins. Different schemes are all
/// kept, in declaration order.
pub fn build_operation(unit: ParsedUnit) -> Result<OperationDescriptor, BuildError> {
    let operation = unit.name;

    let mut routes = Vec::new();
    let mut parameters = Vec::new();
    let mut responses = Vec::new();
    let mut security: Vec<SecurityRequirement> = Vec::new();
    let mut examples = Vec::new();

    let mut seen_params = HashSet::new();
    let mut seen_statuses = HashSet::new();
    let mut seen_examples = HashSet::new();

    for record in unit.records {
        match record {
            AnnotationRecord::RouteBinding(route) => routes.push(route),
            AnnotationRecord::ParameterDescriptor(param) => {
                if !seen_params.insert((param.name.clone(), param.location)) {
                    return Err(BuildError::DuplicateParameter {
                        operation,
                        name: param.name,
                        location: param.location,
                    });
                }
                parameters.push(param);
            }
            AnnotationRecord::ResponseDescriptor(response) => {
                if !seen_statuses.insert(response.status) {
                    return Err(BuildError::DuplicateResponse {
                        operation,
                        status: response.status,
                    });
                }
                responses.push(response);
            }
            AnnotationRecord::SecurityRequirement(requirement) => {
                match security
                    .iter_mut()
                    .find(|r| r.scheme.eq_ignore_ascii_case(&requirement.scheme))
                {
                    Some(existing) => merge_security(existing, requirement),
                    None => security.push(requirement),
                }
            }
            AnnotationRecord::ExampleBinding(example) => {
                if !seen_examples.insert(example.id.clone()) {
                    return Err(BuildError::DuplicateExample {
                        operation,
                        id: example.id,
                    });
                }
                examples.push(example);
            }
        }
    }

    if routes.len() > 1 {
        return Err(BuildError::AmbiguousRoute {
            operation,
            routes: routes
                .iter()
                .map(|r| format!("{} {}", r.verb, r.path))
                .collect(),
        });
    }
    let Some(route) = routes.pop() else {
        return Err(BuildError::MissingRoute { operation });
    };

    let mut seen_tags = HashSet::new();
    let tags = unit
        .tags
        .into_iter()
        .filter(|t| seen_tags.insert(t.clone()))
        .collect();

    tracing::debug!(
        operation = %operation,
        route = %format!("{} {}", route.verb, route.path),
        parameters = parameters.len(),
        responses = responses.len(),
        "built operation"
    );

    Ok(OperationDescriptor {
        name: operation,
        route,
        parameters,
        responses,
        security: if security.is_empty() {
            Security::Anonymous
        } else {
            Security::Required {
                requirements: security,
            }
        },
        tags,
        summary: unit.summary,
        description: unit.description,
        examples,
        signature: unit.signature,
        origin: unit.origin,
    })
}

fn merge_security(first: &mut SecurityRequirement, second: SecurityRequirement) {
    for group in second.groups {
        if !first.groups.contains(&group) {
            first.groups.push(group);
        }
    }
    if first.bearer_format.is_none() {
        first.bearer_format = second.bearer_format;
    }
    if first.http_scheme.is_none() {
        first.http_scheme = second.http_scheme;
    }
    if first.operation_type.is_none() {
        first.operation_type = second.operation_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sextant_parser::{
        AuthorizationLevel, ExampleBinding, ExampleTarget, HttpVerb, ParameterDescriptor,
        ParameterLocation, ResponseDescriptor, RouteBinding, SchemeKind,
    };

    fn unit(records: Vec<AnnotationRecord>) -> ParsedUnit {
        ParsedUnit {
            name: "GetAsync".to_string(),
            tags: Vec::new(),
            summary: None,
            description: None,
            records,
            signature: Vec::new(),
            origin: None,
        }
    }

    fn route(verb: HttpVerb, path: &str) -> AnnotationRecord {
        AnnotationRecord::RouteBinding(RouteBinding {
            verb,
            path: path.to_string(),
            authorization: AuthorizationLevel::Anonymous,
        })
    }

    fn param(name: &str, location: ParameterLocation) -> AnnotationRecord {
        AnnotationRecord::ParameterDescriptor(ParameterDescriptor {
            name: name.to_string(),
            location,
            required: false,
            type_name: None,
            description: None,
            example: None,
            content_type: None,
        })
    }

    fn response(status: u16, body_type: Option<&str>) -> AnnotationRecord {
        AnnotationRecord::ResponseDescriptor(ResponseDescriptor {
            status,
            description: None,
            content_type: None,
            body_type: body_type.map(str::to_string),
            example: None,
        })
    }

    fn security(scheme: &str, groups: &[&str], operation_type: Option<&str>) -> AnnotationRecord {
        AnnotationRecord::SecurityRequirement(SecurityRequirement {
            scheme: scheme.to_string(),
            kind: SchemeKind::Http,
            bearer_format: None,
            http_scheme: None,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            operation_type: operation_type.map(str::to_string),
        })
    }

    #[test]
    fn build_preserves_declaration_order() {
        let op = build_operation(unit(vec![
            param("moduleId", ParameterLocation::Path),
            route(HttpVerb::Get, "sandbox/{moduleId}"),
            response(200, Some("ResourceResult")),
            param("X-SID", ParameterLocation::Header),
            response(401, None),
        ]))
        .unwrap();

        assert_eq!(op.route.path, "sandbox/{moduleId}");
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["moduleId", "X-SID"]);
        let statuses: Vec<u16> = op.responses.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![200, 401]);
        assert!(op.is_anonymous());
    }

    #[test]
    fn route_count_must_be_one() {
        assert_eq!(
            build_operation(unit(vec![response(200, None)])),
            Err(BuildError::MissingRoute {
                operation: "GetAsync".to_string()
            })
        );

        let err = build_operation(unit(vec![
            route(HttpVerb::Put, "items/{id}"),
            route(HttpVerb::Patch, "items/{id}"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::AmbiguousRoute {
                operation: "GetAsync".to_string(),
                routes: vec!["PUT items/{id}".to_string(), "PATCH items/{id}".to_string()],
            }
        );
    }

    #[test]
    fn same_name_in_different_locations_is_allowed() {
        let op = build_operation(unit(vec![
            route(HttpVerb::Get, "a/{id}"),
            param("id", ParameterLocation::Path),
            param("id", ParameterLocation::Query),
        ]))
        .unwrap();
        assert_eq!(op.parameters.len(), 2);

        let err = build_operation(unit(vec![
            route(HttpVerb::Get, "a/{id}"),
            param("id", ParameterLocation::Path),
            param("id", ParameterLocation::Path),
        ]))
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateParameter { location: ParameterLocation::Path, .. }));
    }

    #[test]
    fn duplicate_status_is_an_error_even_when_identical() {
        let err = build_operation(unit(vec![
            route(HttpVerb::Get, "a"),
            response(200, Some("A")),
            response(200, Some("A")),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateResponse {
                operation: "GetAsync".to_string(),
                status: 200
            }
        );
    }

    #[test]
    fn same_scheme_requirements_merge() {
        let op = build_operation(unit(vec![
            route(HttpVerb::Get, "a"),
            security("DocsToken", &["admins"], None),
            security("DocsToken", &["writers", "admins"], Some("Read")),
        ]))
        .unwrap();

        let requirements = op.security.requirements();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].groups, vec!["admins", "writers"]);
        assert_eq!(requirements[0].operation_type.as_deref(), Some("Read"));
    }

    #[test]
    fn stacked_schemes_are_all_kept() {
        let op = build_operation(unit(vec![
            route(HttpVerb::Get, "a"),
            security("DocsToken", &[], Some("Read")),
            security("S2SToken", &[], None),
            security("docstoken", &["admins"], None),
        ]))
        .unwrap();

        let schemes: Vec<&str> = op
            .security
            .requirements()
            .iter()
            .map(|r| r.scheme.as_str())
            .collect();
        assert_eq!(schemes, vec!["DocsToken", "S2SToken"]);
        let docs = op.security.requirement("DocsToken").unwrap();
        assert_eq!(docs.groups, vec!["admins"]);
        assert_eq!(docs.operation_type.as_deref(), Some("Read"));
    }

    #[test]
    fn duplicate_example_ids() {
        let example = |id: &str, status: u16| {
            AnnotationRecord::ExampleBinding(ExampleBinding {
                id: id.to_string(),
                target: Some(ExampleTarget::Response(status)),
            })
        };
        let err = build_operation(unit(vec![
            route(HttpVerb::Get, "a"),
            example("Ok", 200),
            example("Ok", 201),
        ]))
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateExample { id, .. } if id == "Ok"));
    }

    #[test]
    fn tags_are_deduplicated() {
        let mut parsed = unit(vec![route(HttpVerb::Get, "a")]);
        parsed.tags = vec!["Repo".into(), "Admin".into(), "Repo".into()];
        parsed.summary = Some("Get sandbox".into());

        let op = build_operation(parsed).unwrap();
        assert_eq!(op.tags, vec!["Repo", "Admin"]);
        assert_eq!(op.summary.as_deref(), Some("Get sandbox"));
    }
}
