#![forbid(unsafe_code)]

//! Lenient extraction of node records and cluster groups from DOT text.
//!
//! Nothing here builds a syntax tree or validates the notation. Malformed
//! input yields fewer or emptier records plus warnings, never an error.

mod extract;
mod group_builder;
mod groups;
mod sanitize;

use dv_core::GroupedNodes;
use serde::Serialize;

pub use extract::extract_nodes;
pub use groups::parse_groups;
pub use sanitize::sanitize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupParse {
    pub groups: GroupedNodes,
    pub warnings: Vec<String>,
}

/// Whether the first significant line is a `graph`/`digraph` header and the
/// text has a brace-delimited body.
#[must_use]
pub fn looks_like_dot(input: &str) -> bool {
    let Some(first_line) = input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !is_comment_line(line))
    else {
        return false;
    };
    let lower = first_line.to_ascii_lowercase();
    let header = lower.strip_prefix("strict").map_or(lower.as_str(), str::trim_start);
    let keyword_rest = header
        .strip_prefix("digraph")
        .or_else(|| header.strip_prefix("graph"));
    let Some(rest) = keyword_rest else {
        return false;
    };
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('{')) {
        return false;
    }
    input.contains('{') && input.contains('}')
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with("//") || line.starts_with('#') || line.starts_with("/*")
}
