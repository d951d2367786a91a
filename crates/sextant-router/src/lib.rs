//! Route template normalization and prefix-trie index.
//!
//! Route templates are compared structurally: literal segments are
//! case-insensitive, and placeholder segments match each other regardless
//! of their names (`/users/{id}` and `/Users/{userId}` are the same route).
//! The trie resolves both templates and concrete request paths.

pub mod template;
pub mod trie;

pub use template::{
    normalize_path, normalize_template, parse_segments, placeholders, Placeholder, RouteKey,
    Segment,
};
pub use trie::{RouteEntry, RouteMatch, Router};
