//! Source scanner for attribute-annotated handler methods.
//!
//! Handlers are methods decorated with `[Function(...)]` whose signature
//! carries an `[HttpTrigger(...)]` parameter. Everything else (helpers,
//! constructors, timer functions) is skipped. Route prefixes come from the
//! nearest `host.json`.

mod attribute;
mod host;
mod mapping;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::model::HandlerUnit;
use attribute::{read_balanced, strip_comments, Attribute};
use mapping::{build_unit, MethodDecl};

const HOST_CONFIG: &str = "host.json";

/// Directories never scanned: build output and tooling.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "node_modules", "target"];

fn method_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:(?:public|protected|private|internal|static|async|virtual|override|sealed|abstract|extern|unsafe|new|partial)[ \t]+)+([\w<>\[\],.?]+(?:[ \t]*,[ \t]*[\w<>\[\],.?]+)*)[ \t]+(\w+)[ \t]*(?:<[^>\n]*>)?[ \t]*\(",
        )
        .expect("method header pattern is valid")
    })
}

fn type_declaration() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\w+[ \t]+)*(?:class|record|struct|interface|enum|namespace)\b")
            .expect("type declaration pattern is valid")
    })
}

/// Scan handler source text. `origin` names the file in each unit's origin.
pub fn scan_source(text: &str, origin: &str) -> Vec<HandlerUnit> {
    let text = strip_comments(&text.replace("\r\n", "\n"));
    let bytes = text.as_bytes();

    let mut units = Vec::new();
    let mut pending: Vec<Attribute> = Vec::new();
    let mut pending_at = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if bytes[pos] == b'[' {
            if let Some((inner, end)) = read_balanced(&text, pos) {
                if pending.is_empty() {
                    pending_at = pos;
                }
                pending.extend(Attribute::parse_block(inner));
                pos = end;
                continue;
            }
        }

        let rest = &text[pos..];
        if !type_declaration().is_match(rest) {
            if let Some(caps) = method_header().captures(rest) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                    pending.clear();
                    pos = next_line(bytes, pos);
                    continue;
                };
                let open = pos + whole.end() - 1;
                if let Some((params, end)) = read_balanced(&text, open) {
                    if !pending.is_empty() {
                        let decl = MethodDecl {
                            name: name.as_str(),
                            attributes: &pending,
                            params,
                            origin: format!("{}:{}", origin, line_of(&text, pending_at)),
                        };
                        units.extend(build_unit(&decl));
                    }
                    pending.clear();
                    pos = end;
                    continue;
                }
            }
        }

        pending.clear();
        pos = next_line(bytes, pos);
    }

    tracing::debug!(origin, units = units.len(), "scanned source");
    units
}

fn next_line(bytes: &[u8], pos: usize) -> usize {
    bytes[pos..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |i| pos + i + 1)
}

fn line_of(text: &str, pos: usize) -> usize {
    text[..pos].matches('\n').count() + 1
}

/// Scan a single source file. Route prefixes are not applied.
pub fn scan_file(path: &Path) -> Result<Vec<HandlerUnit>, ScanError> {
    let origin = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    scan_path(path, &origin)
}

fn scan_path(path: &Path, origin: &str) -> Result<Vec<HandlerUnit>, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(scan_source(&text, origin))
}

/// Scan every `.cs` file under `root` in sorted order.
///
/// Each route path gets the `extensions.http.routePrefix` of the nearest
/// `host.json` at or above the file's directory, stopping at `root`.
pub fn scan_directory(root: &Path) -> Result<Vec<HandlerUnit>, ScanError> {
    let mut prefixes = PrefixCache::new(root);
    let mut units = Vec::new();
    let mut files = 0usize;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.map_err(|e| ScanError::Walk {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("cs") {
            continue;
        }

        let origin = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let mut scanned = scan_path(path, &origin)?;
        files += 1;

        let directory = path.parent().unwrap_or(root);
        if let Some(prefix) = prefixes.lookup(directory)? {
            apply_route_prefix(&mut scanned, &prefix);
        }
        units.extend(scanned);
    }

    tracing::info!(root = %root.display(), files, units = units.len(), "scanned source tree");
    Ok(units)
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

fn apply_route_prefix(units: &mut [HandlerUnit], prefix: &str) {
    for unit in units {
        for entry in unit.annotations.iter_mut().filter(|e| e.tag == "route") {
            if let Some(serde_json::Value::String(path)) = entry.fields.get_mut("path") {
                *path = host::join_route(prefix, path);
            }
        }
    }
}

/// Nearest-ancestor `host.json` prefixes, memoized per directory.
struct PrefixCache {
    root: PathBuf,
    known: HashMap<PathBuf, Option<String>>,
}

impl PrefixCache {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            known: HashMap::new(),
        }
    }

    fn lookup(&mut self, directory: &Path) -> Result<Option<String>, ScanError> {
        if let Some(prefix) = self.known.get(directory) {
            return Ok(prefix.clone());
        }

        let config = directory.join(HOST_CONFIG);
        let prefix = if config.is_file() {
            let prefix = host::read_route_prefix(&config)?;
            tracing::debug!(path = %config.display(), prefix = ?prefix, "read host config");
            prefix
        } else {
            match directory.parent() {
                Some(parent) if directory != self.root && parent.starts_with(&self.root) => {
                    self.lookup(parent)?
                }
                _ => None,
            }
        };

        self.known.insert(directory.to_path_buf(), prefix.clone());
        Ok(prefix)
    }
}
