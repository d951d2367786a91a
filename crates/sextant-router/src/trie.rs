use std::collections::HashMap;

use crate::template::{normalize_path, parse_segments, structural_literal, Placeholder, Segment};

/// The route trie. Maps (verb, template) pairs to operation entries.
#[derive(Debug, Default)]
pub struct Router {
    root: Node,
    len: usize,
}

/// A single node in the prefix trie.
#[derive(Debug, Default)]
struct Node {
    /// Static children keyed by lowercased segment.
    static_children: HashMap<String, Node>,
    /// Parameter child (at most one per node).
    param_child: Option<Box<ParamNode>>,
    /// Catch-all child. Only valid at a terminal position.
    wildcard_child: Option<Box<ParamNode>>,
    /// Verb-to-route mapping at this terminal node.
    methods: HashMap<String, RouteEntry>,
}

/// A parameter segment node.
#[derive(Debug)]
struct ParamNode {
    /// Name from the first template inserted through this node.
    name: String,
    node: Node,
}

/// A matched route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Index into the operation list.
    pub operation_index: usize,
}

/// The result of a route lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMatch {
    /// Matched a path and verb.
    Found {
        entry: RouteEntry,
        params: Vec<(String, String)>,
    },
    /// Path matched but the verb is not bound.
    MethodNotAllowed { allowed: Vec<String> },
    /// No path matched.
    NotFound,
}

/// A segment of a lookup path.
enum Probe<'a> {
    /// Concrete text (or a literal template segment).
    Literal { key: String, raw: &'a str },
    /// A template placeholder; matches parameter nodes only.
    Param,
    /// A template catch-all; matches wildcard nodes only.
    Wildcard,
}

impl Router {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of routes inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a route template.
    ///
    /// Structurally equal templates share a node, so a second insert for the
    /// same verb fails and returns the entry that already owns the route.
    pub fn insert(&mut self, template: &str, verb: &str, entry: RouteEntry) -> Result<(), RouteEntry> {
        let segments = parse_segments(template);
        let node = self.traverse_or_create(&segments);
        let verb = verb.to_uppercase();

        if let Some(existing) = node.methods.get(&verb) {
            return Err(existing.clone());
        }
        node.methods.insert(verb, entry);
        self.len += 1;
        Ok(())
    }

    /// Look up a concrete request path or a route template.
    ///
    /// Literal segments take precedence over placeholders. Placeholder
    /// segments in the probe match placeholder nodes regardless of name.
    pub fn lookup(&self, path: &str, verb: &str) -> RouteMatch {
        let normalized = normalize_path(path);
        let probes: Vec<Probe<'_>> = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .map(classify)
            .collect();

        let mut params = Vec::new();
        match traverse_and_match(&self.root, &probes, &mut params) {
            Some(node) => {
                if let Some(entry) = node.methods.get(&verb.to_uppercase()) {
                    RouteMatch::Found {
                        entry: entry.clone(),
                        params,
                    }
                } else {
                    let mut allowed: Vec<String> = node.methods.keys().cloned().collect();
                    allowed.sort();
                    RouteMatch::MethodNotAllowed { allowed }
                }
            }
            None => RouteMatch::NotFound,
        }
    }

    /// Traverse or create nodes for a template.
    fn traverse_or_create(&mut self, segments: &[Segment]) -> &mut Node {
        let mut current = &mut self.root;

        for segment in segments {
            current = match segment {
                Segment::Static(text) => current.static_children.entry(text.clone()).or_default(),
                Segment::Param(name) => {
                    &mut current
                        .param_child
                        .get_or_insert_with(|| {
                            Box::new(ParamNode {
                                name: name.clone(),
                                node: Node::default(),
                            })
                        })
                        .node
                }
                Segment::Wildcard(name) => {
                    &mut current
                        .wildcard_child
                        .get_or_insert_with(|| {
                            Box::new(ParamNode {
                                name: name.clone(),
                                node: Node::default(),
                            })
                        })
                        .node
                }
            };
        }

        current
    }
}

fn classify(segment: &str) -> Probe<'_> {
    if segment.starts_with('{') && segment.ends_with('}') && segment.matches('{').count() == 1 {
        if let Some(placeholder) = Placeholder::parse(&segment[1..segment.len() - 1]) {
            return if placeholder.catch_all {
                Probe::Wildcard
            } else {
                Probe::Param
            };
        }
    }
    Probe::Literal {
        key: structural_literal(segment),
        raw: segment,
    }
}

/// Traverse the trie, capturing concrete parameter values.
/// Returns the terminal node if the path matches, None otherwise.
fn traverse_and_match<'a>(
    node: &'a Node,
    probes: &[Probe<'_>],
    params: &mut Vec<(String, String)>,
) -> Option<&'a Node> {
    let Some((probe, remaining)) = probes.split_first() else {
        // Intermediate nodes without verbs are not routes; keep backtracking.
        return (!node.methods.is_empty()).then_some(node);
    };

    match probe {
        Probe::Literal { key, raw } => {
            // Static children take precedence (most specific match).
            if let Some(child) = node.static_children.get(key) {
                if let Some(result) = traverse_and_match(child, remaining, params) {
                    return Some(result);
                }
            }

            if let Some(param_child) = &node.param_child {
                let param_len = params.len();
                params.push((param_child.name.clone(), raw.to_string()));

                if let Some(result) = traverse_and_match(&param_child.node, remaining, params) {
                    return Some(result);
                }

                // Backtrack if this path didn't work.
                params.truncate(param_len);
            }

            // Catch-all consumes the current and all remaining segments.
            if let Some(wildcard_child) = &node.wildcard_child {
                if remaining.iter().all(|p| matches!(p, Probe::Literal { .. })) {
                    let joined = probes
                        .iter()
                        .filter_map(|p| match p {
                            Probe::Literal { raw, .. } => Some(*raw),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join("/");
                    params.push((wildcard_child.name.clone(), joined));
                    return Some(&wildcard_child.node);
                }
            }

            None
        }
        Probe::Param => {
            let param_child = node.param_child.as_ref()?;
            traverse_and_match(&param_child.node, remaining, params)
        }
        Probe::Wildcard => {
            if !remaining.is_empty() {
                return None;
            }
            node.wildcard_child.as_ref().map(|w| &w.node)
        }
    }
}
