//! Regex heuristics over template source.
//!
//! None of these parse Tera properly. They are kept as small pure functions so
//! each one can be tested and swapped for a real parser independently.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{%-?\s*(?:include|extends|import)\s+["']([^"']+)["']"#)
        .expect("valid include regex")
});

static EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{-?(.*?)-?\}\}").expect("valid expression regex"));

static STATEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%-?(.*?)-?%\}").expect("valid statement regex"));

static STRING_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("valid literal regex"));

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"));

static FOR_BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*for\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s+in\b")
        .expect("valid for regex")
});

static SET_BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*set(?:_global)?\s+([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("valid set regex")
});

static ERROR_LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("valid location regex"));

static ENCODED_OPEN_EXPR: Lazy<Regex> = Lazy::new(|| encoded_pair(LBRACE, LBRACE));
static ENCODED_CLOSE_EXPR: Lazy<Regex> = Lazy::new(|| encoded_pair(RBRACE, RBRACE));
static ENCODED_OPEN_STMT: Lazy<Regex> = Lazy::new(|| encoded_pair(LBRACE, PERCENT));
static ENCODED_CLOSE_STMT: Lazy<Regex> = Lazy::new(|| encoded_pair(PERCENT, RBRACE));

const LBRACE: &str = r"(?:&(?:amp;)?(?:#123|#x7[bB]|lbrace|lcub);|\{)";
const RBRACE: &str = r"(?:&(?:amp;)?(?:#125|#x7[dD]|rbrace|rcub);|\})";
const PERCENT: &str = r"(?:&(?:amp;)?(?:#37|#x25|percnt);|%)";

fn encoded_pair(first: &str, second: &str) -> Regex {
    Regex::new(&format!("{first}{second}")).expect("valid delimiter regex")
}

/// Words that appear inside tags but never name context variables
const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "endif", "for", "in", "endfor", "set", "set_global", "include",
    "extends", "import", "block", "endblock", "macro", "endmacro", "filter", "endfilter", "raw",
    "endraw", "with", "and", "or", "not", "is", "true", "false", "True", "False", "none",
    "loop", "self", "super", "break", "continue", "as", "ignore", "missing", "helpers",
];

/// Un-escape HTML-entity-encoded Tera delimiters (`&#123;&#123;` → `{{`).
///
/// Only delimiter pairs are touched; a lone `&#123;` elsewhere in the text is kept.
pub fn sanitize_source(source: &str) -> String {
    let pass = ENCODED_OPEN_EXPR.replace_all(source, "{{");
    let pass = ENCODED_CLOSE_EXPR.replace_all(&pass, "}}");
    let pass = ENCODED_OPEN_STMT.replace_all(&pass, "{%");
    ENCODED_CLOSE_STMT.replace_all(&pass, "%}").into_owned()
}

/// Names referenced by `include`, `extends` and `import` tags, in order, deduplicated
pub fn extract_dependencies(source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    INCLUDE_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Root variable names a template reads from its context.
///
/// Attribute accesses, filter and function names, loop and `set` bindings
/// and control keywords are excluded.
pub fn extract_variables(source: &str) -> Vec<String> {
    let mut bound = HashSet::new();
    let mut variables = BTreeSet::new();

    let tags = STATEMENT_RE
        .captures_iter(source)
        .chain(EXPRESSION_RE.captures_iter(source))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    let mut bodies = Vec::new();
    for body in tags {
        if let Some(caps) = FOR_BINDING_RE.captures(body) {
            bound.extend(caps.iter().skip(1).flatten().map(|m| m.as_str().to_string()));
        }
        if let Some(caps) = SET_BINDING_RE.captures(body) {
            bound.extend(caps.get(1).map(|m| m.as_str().to_string()));
        }
        bodies.push(STRING_LITERAL_RE.replace_all(body, "\"\"").into_owned());
    }

    for body in &bodies {
        for m in IDENTIFIER_RE.find_iter(body) {
            let name = m.as_str();
            let before = body[..m.start()].trim_end();
            let after = body[m.end()..].trim_start();
            let is_member = before.ends_with('.');
            let is_filter = before.ends_with('|');
            let is_call = after.starts_with('(');
            let is_kwarg = after.starts_with('=') && !after.starts_with("==");
            let is_number_suffix = before
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_digit());

            if is_member || is_filter || is_call || is_kwarg || is_number_suffix {
                continue;
            }
            if KEYWORDS.contains(&name) || bound.contains(name) {
                continue;
            }
            variables.insert(name.to_string());
        }
    }

    variables.into_iter().collect()
}

/// Line and column from a parser message (`--> 3:7`)
pub fn extract_error_location(message: &str) -> Option<(usize, usize)> {
    let caps = ERROR_LOCATION_RE.captures(message)?;
    let line = caps.get(1)?.as_str().parse().ok()?;
    let column = caps.get(2)?.as_str().parse().ok()?;
    Some((line, column))
}
