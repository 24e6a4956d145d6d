//! Cluster grouping over a sanitized document.
//!
//! The scan is line oriented: a `subgraph <id> {` line opens a block that
//! runs until the running brace count drops back to zero. Everything the
//! block contains, nested sub-blocks included, belongs to that block's group.

use std::sync::OnceLock;

use regex::Regex;

use crate::group_builder::GroupBuilder;
use crate::{GroupParse, extract_nodes, looks_like_dot};

fn subgraph_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*(?i:subgraph)\s+("[^"]*"|[^\s{]+)\s*\{"#)
            .expect("valid subgraph header regex")
    })
}

fn group_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\blabel\s*=\s*"([^"]+)""#).expect("valid group label regex"))
}

/// Group every node declaration of `text` by the cluster block it sits in.
///
/// Nodes outside any block, and nodes only found by the final whole-document
/// pass, go to the `"Other"` group. The final pass skips ids that some group
/// already holds. Records come out normalized.
#[must_use]
pub fn parse_groups(text: &str) -> GroupParse {
    let mut builder = GroupBuilder::new();
    if !text.trim().is_empty() && !looks_like_dot(text) {
        builder.add_warning("input does not look like a DOT graph");
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut index = 0;
    while index < lines.len() {
        let Some(group_id) = subgraph_header(lines[index]) else {
            builder.extend_other(extract_nodes(lines[index]));
            index += 1;
            continue;
        };

        let start = index;
        let mut depth: i64 = 0;
        let mut closed = false;
        while index < lines.len() {
            depth += brace_delta(lines[index]);
            index += 1;
            if depth <= 0 {
                closed = true;
                break;
            }
        }
        if !closed {
            builder.add_warning(format!(
                "Line {}: subgraph block '{group_id}' is not closed before end of input",
                start + 1
            ));
        }

        let block = lines[start..index].join("\n");
        let name = block_label(&block).unwrap_or(group_id);
        builder.extend_group(&name, extract_nodes(&block));
    }

    builder.claim_unassigned(extract_nodes(text));

    if builder.node_count() == 0 {
        builder.add_warning("no node declarations found");
    }

    builder.finish()
}

/// Identifier of a `subgraph <id> {` line, quotes stripped.
fn subgraph_header(line: &str) -> Option<String> {
    let caps = subgraph_header_regex().captures(line)?;
    Some(caps[1].trim_matches('"').to_string())
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |depth, ch| match ch {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

/// Display name for a block: the first `label="..."` written at the block's
/// own level, else the first one anywhere inside it.
fn block_label(block: &str) -> Option<String> {
    let mut scanner = LevelScanner::default();
    let mut fallback = None;
    for caps in group_label_regex().captures_iter(block) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        scanner.advance_to(block, whole.start());
        let value = caps[1].to_string();
        if scanner.at_block_level() {
            return Some(value);
        }
        fallback.get_or_insert(value);
    }
    fallback
}

/// Tracks brace, bracket and quote nesting while walking forward in a block.
#[derive(Debug, Default)]
struct LevelScanner {
    offset: usize,
    braces: i64,
    brackets: i64,
    in_quotes: bool,
    escaped: bool,
}

impl LevelScanner {
    fn advance_to(&mut self, text: &str, offset: usize) {
        if offset <= self.offset {
            return;
        }
        for ch in text[self.offset..offset].chars() {
            if self.in_quotes {
                match ch {
                    _ if self.escaped => self.escaped = false,
                    '\\' => self.escaped = true,
                    '"' => self.in_quotes = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => self.in_quotes = true,
                '{' => self.braces += 1,
                '}' => self.braces -= 1,
                '[' => self.brackets += 1,
                ']' => self.brackets -= 1,
                _ => {}
            }
        }
        self.offset = offset;
    }

    fn at_block_level(&self) -> bool {
        !self.in_quotes && self.braces == 1 && self.brackets == 0
    }
}

#[cfg(test)]
mod tests {
    use dv_core::OTHER_GROUP;

    use super::{block_label, parse_groups};

    fn names(text: &str) -> Vec<String> {
        parse_groups(text)
            .groups
            .groups()
            .iter()
            .map(|group| group.name.clone())
            .collect()
    }

    #[test]
    fn cluster_label_names_the_group() {
        let text = "digraph G {\nsubgraph cluster0 { label=\"Team A\"; alice[label=\"Alice\"]; }\n}";
        let parsed = parse_groups(text);
        let group = parsed.groups.get("Team A").expect("Team A group");
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].id, "alice");
        assert_eq!(group.members[0].label, "Alice");
        assert_eq!(parsed.groups.len(), 1);
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
    }

    #[test]
    fn raw_identifier_names_unlabelled_blocks() {
        let text = "graph G {\n  subgraph \"cluster ops\" {\n    bob [work=\"Deploy\"]\n  }\n}";
        assert_eq!(names(text), vec!["cluster ops"]);
    }

    #[test]
    fn nodes_outside_blocks_land_in_other() {
        let text = "digraph G {\n  solo [label=\"Solo\"];\n  subgraph cluster_a {\n    a [work=\"X\"]\n  }\n}";
        let parsed = parse_groups(text);
        assert_eq!(names(text), vec!["cluster_a".to_string(), OTHER_GROUP.to_string()]);
        let other = parsed.groups.get(OTHER_GROUP).expect("Other group");
        assert_eq!(other.members[0].label, "Solo");
    }

    #[test]
    fn multi_line_blocks_track_nested_braces() {
        let text = "digraph G {\n\
            subgraph cluster_outer {\n\
              label=\"Outer\";\n\
              subgraph cluster_inner {\n\
                label=\"Inner\";\n\
                x [label=\"X\"];\n\
              }\n\
              y [label=\"Y\"];\n\
            }\n\
            z [label=\"Z\"];\n\
            }";
        let parsed = parse_groups(text);
        let outer = parsed.groups.get("Outer").expect("outer group");
        let ids: Vec<&str> = outer.members.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert!(parsed.groups.get("Inner").is_none());
        assert_eq!(parsed.groups.get(OTHER_GROUP).expect("other").members[0].id, "z");
    }

    #[test]
    fn blocks_with_the_same_name_merge() {
        let text = "digraph G {\n\
            subgraph c1 { label=\"Team\"; a [label=\"A\"] }\n\
            subgraph c2 { label=\"Team\"; b [label=\"B\"] }\n\
            }";
        let parsed = parse_groups(text);
        assert_eq!(parsed.groups.len(), 1);
        assert_eq!(parsed.groups.get("Team").expect("team").members.len(), 2);
    }

    #[test]
    fn duplicate_ids_stay_in_each_declaring_block() {
        let text = "digraph G {\n\
            subgraph c1 { label=\"One\"; a [label=\"A\"] }\n\
            subgraph c2 { label=\"Two\"; a [label=\"A\"] }\n\
            }";
        let parsed = parse_groups(text);
        assert_eq!(parsed.groups.get("One").expect("one").members.len(), 1);
        assert_eq!(parsed.groups.get("Two").expect("two").members.len(), 1);
        assert!(parsed.groups.get(OTHER_GROUP).is_none());
    }

    #[test]
    fn catch_all_pass_adds_only_unseen_ids() {
        // A declaration split over several lines outside any block is only
        // found by the whole-document pass.
        let text = "digraph G {\n  bob [\n    label=\"Bob\"\n  ]\n  subgraph c { label=\"T\"; a [label=\"A\"] }\n}";
        let parsed = parse_groups(text);
        assert_eq!(parsed.groups.node_count(), 2);
        assert_eq!(parsed.groups.get("T").expect("T").members[0].id, "a");
        assert_eq!(parsed.groups.get(OTHER_GROUP).expect("other").members[0].label, "Bob");

        let text = "digraph G {\n  subgraph c { label=\"T\"; a [label=\"A\"] }\n  a [\n    label=\"Again\"\n  ]\n}";
        let parsed = parse_groups(text);
        assert_eq!(parsed.groups.node_count(), 1);
        assert!(parsed.groups.get(OTHER_GROUP).is_none());
    }

    #[test]
    fn records_are_normalized() {
        let text = "digraph G {\n  a [work=\"a; b ;c\"]\n  b [label=\"\"]\n}";
        let parsed = parse_groups(text);
        let other = parsed.groups.get(OTHER_GROUP).expect("other");
        assert_eq!(other.members[0].work, vec!["a", "b", "c"]);
        assert_eq!(other.members[0].label, "a");
        assert_eq!(other.members[1].label, "b");
        assert!(other.members[1].work.is_empty());
    }

    #[test]
    fn unclosed_block_is_reported_and_still_grouped() {
        let text = "digraph G {\nsubgraph cluster_x {\n  a [shape=box]\n";
        let parsed = parse_groups(text);
        assert_eq!(parsed.groups.get("cluster_x").expect("x").members.len(), 1);
        assert!(
            parsed
                .warnings
                .iter()
                .any(|warning| warning.starts_with("Line 2: subgraph block 'cluster_x'"))
        );
    }

    #[test]
    fn first_node_label_names_a_block_without_its_own() {
        let text = "digraph G {\nsubgraph c { a [label=\"A\"] }\n}";
        assert_eq!(names(text), vec!["A"]);
    }

    #[test]
    fn empty_and_foreign_input_degrade_to_warnings() {
        let parsed = parse_groups("");
        assert!(parsed.groups.is_empty());
        assert_eq!(parsed.warnings, vec!["no node declarations found"]);

        let parsed = parse_groups("flowchart LR\nA --> B");
        assert!(parsed.groups.is_empty());
        assert_eq!(parsed.warnings.len(), 2);
    }

    #[test]
    fn block_label_prefers_the_block_level_attribute() {
        let block = "subgraph c {\n  a [label=\"Node A\"];\n  label=\"Cluster\";\n}";
        assert_eq!(block_label(block).as_deref(), Some("Cluster"));

        let block = "subgraph c {\n  graph [label=\"From Graph Attr\"];\n  a [label=\"A\"];\n}";
        assert_eq!(block_label(block).as_deref(), Some("From Graph Attr"));

        let block = "subgraph c { a [shape=box] }";
        assert_eq!(block_label(block), None);
    }
}
