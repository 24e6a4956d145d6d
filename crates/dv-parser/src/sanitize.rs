//! Source clean-up applied to every document before it is shown, rendered or
//! scanned.
//!
//! Graphviz reads an unquoted `-` as part of an edge operator, so identifiers
//! such as `node-1` only survive when quoted. Documents pasted from word
//! processors also tend to carry typographic dashes and invisible marks.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Code points that are rewritten to an ASCII hyphen.
const DASHES: [char; 7] = [
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash
    '\u{2013}', // en dash
    '\u{2014}', // em dash
    '\u{2015}', // horizontal bar
    '\u{2212}', // minus sign
];

/// Zero-width marks and the byte-order mark, dropped outright.
const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// A bare token with at least one hyphen between two non-empty halves.
const HYPHEN_TOKEN: &str = r#"[^\s,"\[\];()>]+-[^\s,"\[\];()>]+"#;

/// What may follow a token for it to be quoted, in application order.
const FOLLOWERS: [&str; 4] = [r"(\s*\[)", r"(\s*;)", r"(\s*->)", r"(\s*--)"];

fn quoting_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let mut patterns: Vec<Regex> = FOLLOWERS
            .iter()
            .map(|follower| {
                Regex::new(&format!(r"(?mR)(^|[\s,(])({HYPHEN_TOKEN}){follower}"))
                    .expect("valid quoting regex")
            })
            .collect();
        patterns.push(
            Regex::new(&format!(r"(?mR)(^|[\s,(])({HYPHEN_TOKEN})$"))
                .expect("valid end-of-line quoting regex"),
        );
        patterns
    })
}

/// Normalize dashes, drop invisible marks and quote hyphenated identifiers.
///
/// The transform is idempotent: sanitizing already sanitized text returns it
/// unchanged.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .filter(|ch| !INVISIBLE.contains(ch))
        .map(|ch| if DASHES.contains(&ch) { '-' } else { ch })
        .collect();

    for pattern in quoting_patterns() {
        let quoted = pattern.replace_all(&cleaned, quote_token).into_owned();
        cleaned = quoted;
    }
    cleaned
}

fn quote_token(caps: &Captures<'_>) -> String {
    let token = &caps[2];
    // `a--b` is an undirected edge written without spaces, not an identifier.
    if token.contains("--") {
        return caps[0].to_string();
    }
    let follower = caps.get(3).map_or("", |m| m.as_str());
    format!("{}\"{token}\"{follower}", &caps[1])
}
