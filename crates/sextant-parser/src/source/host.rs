//! `host.json` route prefix handling.

use std::path::Path;

use serde::Deserialize;

use crate::error::ScanError;

#[derive(Debug, Default, Deserialize)]
struct HostConfig {
    #[serde(default)]
    extensions: Option<Extensions>,
}

#[derive(Debug, Default, Deserialize)]
struct Extensions {
    #[serde(default)]
    http: Option<HttpExtension>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpExtension {
    #[serde(default)]
    route_prefix: Option<String>,
}

/// Read `extensions.http.routePrefix` from a host config file.
pub(crate) fn read_route_prefix(path: &Path) -> Result<Option<String>, ScanError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_route_prefix(&content).map_err(|message| ScanError::HostConfig {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_route_prefix(content: &str) -> Result<Option<String>, String> {
    let config: HostConfig = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(config
        .extensions
        .and_then(|e| e.http)
        .and_then(|h| h.route_prefix)
        .map(|p| p.trim_matches('/').to_string())
        .filter(|p| !p.is_empty()))
}

/// Join a route prefix and a route: `("api/v2", "sandbox/{id}")` -> `/api/v2/sandbox/{id}`.
pub(crate) fn join_route(prefix: &str, route: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let route = route.trim_start_matches('/');
    match (prefix.is_empty(), route.is_empty()) {
        (true, _) => format!("/{route}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{route}"),
    }
}
