use std::fmt;

use serde::{Deserialize, Serialize};

/// A `{...}` placeholder inside a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Parameter name with constraint and markers removed (`{id:int?}` -> `id`).
    pub name: String,
    /// Catch-all placeholder (`{*rest}` or `{rest+}`), consumes remaining segments.
    pub catch_all: bool,
    /// Optional placeholder (`{id?}`).
    pub optional: bool,
}

impl Placeholder {
    /// Parse the text between braces.
    ///
    /// Returns `None` when nothing remains once markers are stripped.
    pub fn parse(inner: &str) -> Option<Self> {
        let mut rest = inner.trim();
        let mut catch_all = false;
        let mut optional = false;

        if let Some(stripped) = rest.strip_prefix('*') {
            rest = stripped;
            catch_all = true;
        }
        if let Some(stripped) = rest.strip_suffix('?') {
            rest = stripped;
            optional = true;
        }
        if let Some(stripped) = rest.strip_suffix('+') {
            rest = stripped;
            catch_all = true;
        }
        let name = match rest.split_once(':') {
            Some((name, _constraint)) => name,
            None => rest,
        };

        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            catch_all,
            optional,
        })
    }
}

/// A parsed template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, lowercased. Embedded placeholders (`file.{ext}`) appear as `{}`.
    Static(String),
    /// A whole-segment placeholder.
    Param(String),
    /// A whole-segment catch-all. Must be the last segment.
    Wildcard(String),
}

/// Split a route template into structural segments.
pub fn parse_segments(template: &str) -> Vec<Segment> {
    template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('{') && s.ends_with('}') && s.matches('{').count() == 1 {
                if let Some(placeholder) = Placeholder::parse(&s[1..s.len() - 1]) {
                    return if placeholder.catch_all {
                        Segment::Wildcard(placeholder.name)
                    } else {
                        Segment::Param(placeholder.name)
                    };
                }
            }
            Segment::Static(structural_literal(s))
        })
        .collect()
}

/// Lowercase a literal segment and blank out any embedded placeholder names.
pub(crate) fn structural_literal(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut in_param = false;

    for ch in segment.chars() {
        match ch {
            '{' => {
                out.push('{');
                in_param = true;
            }
            '}' => {
                out.push('}');
                in_param = false;
            }
            _ if in_param => {}
            _ => out.extend(ch.to_lowercase()),
        }
    }

    out
}

/// Names of all placeholders in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut current = String::new();
    let mut in_param = false;

    for ch in template.chars() {
        match ch {
            '{' => {
                in_param = true;
                current.clear();
            }
            '}' if in_param => {
                in_param = false;
                if let Some(placeholder) = Placeholder::parse(&current) {
                    found.push(placeholder);
                }
            }
            _ if in_param => current.push(ch),
            _ => {}
        }
    }

    found
}

/// Normalize a request path: ensure a leading slash, collapse double slashes,
/// strip the trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    let mut prev_slash = false;

    if !path.starts_with('/') {
        normalized.push('/');
        prev_slash = true;
    }

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    // Strip trailing slash (but keep root "/")
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Structural form of a template: `/Sandbox/{moduleId}/info/` -> `/sandbox/{}/info`.
pub fn normalize_template(template: &str) -> String {
    let segments = parse_segments(template);
    if segments.is_empty() {
        return "/".to_string();
    }

    let mut out = String::with_capacity(template.len());
    for segment in &segments {
        out.push('/');
        match segment {
            Segment::Static(text) => out.push_str(text),
            Segment::Param(_) => out.push_str("{}"),
            Segment::Wildcard(_) => out.push_str("{*}"),
        }
    }
    out
}

/// Index key for a route: uppercase verb plus structural path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub verb: String,
    pub path: String,
}

impl RouteKey {
    pub fn new(verb: &str, template: &str) -> Self {
        Self {
            verb: verb.to_uppercase(),
            path: normalize_template(template),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}
