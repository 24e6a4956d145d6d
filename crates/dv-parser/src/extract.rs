use std::sync::OnceLock;

use dv_core::RawNode;
use regex::Regex;

/// Bare identifiers that introduce default attribute lists, not nodes.
const DEFAULT_ATTR_KEYWORDS: [&str; 3] = ["node", "edge", "graph"];

fn node_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)(?P<id>"[^"]+"|[A-Za-z0-9_\-]+)\s*\[\s*(?P<attrs>[^\]]*?)\s*\]"#)
            .expect("valid node declaration regex")
    })
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\blabel\s*=\s*"([^"]*)""#).expect("valid label regex"))
}

fn work_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bwork\s*=\s*"([^"]*)""#).expect("valid work regex"))
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:href|url)\s*=\s*"([^"]*)""#).expect("valid link regex")
    })
}

/// Find every `id [ attributes ]` declaration in `text`, in source order.
///
/// Identifiers are either quoted strings (quotes stripped) or bare runs of
/// ASCII letters, digits, `_` and `-`. Only the quoted forms of `label`,
/// `work` and `href`/`URL` are read; anything else in the brackets is ignored
/// and a missing or malformed attribute leaves its field empty.
#[must_use]
pub fn extract_nodes(text: &str) -> Vec<RawNode> {
    node_decl_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let raw_id = caps.name("id")?.as_str();
            if is_default_attr_keyword(raw_id) {
                return None;
            }
            let attrs = caps.name("attrs").map_or("", |m| m.as_str());
            Some(RawNode {
                id: raw_id.trim_matches('"').to_string(),
                label: first_capture(label_regex(), attrs),
                work: first_capture(work_regex(), attrs),
                link: first_capture(link_regex(), attrs),
            })
        })
        .collect()
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_default_attr_keyword(raw_id: &str) -> bool {
    !raw_id.starts_with('"')
        && DEFAULT_ATTR_KEYWORDS
            .iter()
            .any(|keyword| raw_id.eq_ignore_ascii_case(keyword))
}
