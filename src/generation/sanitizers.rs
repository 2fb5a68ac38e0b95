//! Identifier and comment sanitizers for generated code.
//!
//! Operation ids and path segments come from hand-written specifications and
//! may contain anything; generated sources need plain identifiers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::utils::capitalize;

static NON_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid separator regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static SMART_PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{2018}\u{2019}\u{201C}\u{201D}\u{2013}\u{2014}]").expect("valid unicode regex")
});

/// Turn an operation id into a camelCase identifier.
///
/// Separators are dropped and the following word capitalized; a leading digit
/// gets an underscore prefix. Existing inner casing is kept.
///
/// # Examples
/// ```
/// use servicegen::generation::sanitizers::sanitize_operation_id;
///
/// assert_eq!(sanitize_operation_id("list-pets"), "listPets");
/// assert_eq!(sanitize_operation_id("getUserById"), "getUserById");
/// assert_eq!(sanitize_operation_id("2fa.verify"), "_2faVerify");
/// ```
pub fn sanitize_operation_id(operation_id: &str) -> String {
    let words: Vec<&str> = NON_IDENT_RE
        .split(operation_id)
        .filter(|w| !w.is_empty())
        .collect();

    let mut ident = String::new();
    for (index, word) in words.iter().enumerate() {
        if index == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                ident.extend(first.to_lowercase());
                ident.push_str(chars.as_str());
            }
        } else {
            ident.push_str(&capitalize(word));
        }
    }

    prefix_leading_digit(ident)
}

/// Sanitize one literal path segment into a PascalCase word (`order-items` → `OrderItems`)
pub fn sanitize_segment(segment: &str) -> String {
    NON_IDENT_RE
        .split(segment)
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

fn prefix_leading_digit(ident: String) -> String {
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident
    }
}

/// Make free text safe for a single-line comment in generated code.
///
/// Smart punctuation is replaced, whitespace collapsed and block-comment
/// terminators broken up.
pub fn sanitize_doc(input: &str) -> String {
    let plain = SMART_PUNCTUATION_RE.replace_all(input, |caps: &regex::Captures| {
        match &caps[0] {
            "\u{2018}" | "\u{2019}" => "'",
            "\u{201C}" | "\u{201D}" => "\"",
            _ => "-",
        }
    });
    WHITESPACE_RE
        .replace_all(plain.trim(), " ")
        .replace("*/", "* /")
}
