//! Query cleaning and tokenization.
//!
//! Natural-language annotations arrive as raw sentences; before encoding,
//! quoted string literals are lifted out into `_STR:k_` placeholders
//! (mirrored into the paired tree's value slots, so copy actions line up),
//! and the sentence is word-tokenized with dotted call paths expanded into
//! bracketed component sequences.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::tree::Tree;

lazy_static! {
    /// A single- or double-quoted string literal with escape support.
    static ref QUOTED_STRING_RE: Regex =
        Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).unwrap();
    /// A placeholder produced by [`process_query`]; kept atomic by the
    /// tokenizer.
    static ref STR_PLACEHOLDER_RE: Regex = Regex::new(r"^_STR:\d+_$").unwrap();
}

/// A cleaned query: its token sequence plus the literal → placeholder
/// substitutions that were applied (needed to restore literals after
/// decoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedQuery {
    pub tokens: Vec<String>,
    pub str_map: Vec<(String, String)>,
}

/// Replaces every quoted string literal in `query` with a `_STR:k_`
/// placeholder, applies the same substitution to matching value slots of
/// the paired tree, and tokenizes the result.
pub fn process_query(query: &str, tree: &mut Tree) -> CleanedQuery {
    let mut query = query.trim().to_string();
    let mut str_map: Vec<(String, String)> = Vec::new();

    while let Some(found) = QUOTED_STRING_RE.find(&query) {
        let literal = found.as_str().to_string();
        let placeholder = format!("_STR:{}_", str_map.len());
        let range = found.range();
        query.replace_range(range, &placeholder);

        // The tree stores the literal without quotes; match either form.
        let inner = literal[1..literal.len() - 1].to_string();
        tree.relabel_values(|label| {
            (label == literal || label == inner).then(|| placeholder.clone())
        });

        str_map.push((literal, placeholder));
    }

    CleanedQuery {
        tokens: query_tokens(&query),
        str_map,
    }
}

/// Tokenizes a (cleaned) query.
///
/// Placeholders stay atomic. Tokens with an interior dot (call paths like
/// `os.path.join`) are kept whole and followed by a bracketed expansion of
/// their components, so both the joined and the split form are available
/// for copying. Everything else goes through unicode word segmentation.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in query.split_whitespace() {
        if STR_PLACEHOLDER_RE.is_match(raw) {
            tokens.push(raw.to_string());
            continue;
        }
        if has_interior_dot(raw) {
            tokens.push(raw.to_string());
            tokens.push("[".to_string());
            for (i, component) in raw.split('.').enumerate() {
                if i > 0 {
                    tokens.push(".".to_string());
                }
                if !component.is_empty() {
                    tokens.push(component.to_string());
                }
            }
            tokens.push("]".to_string());
            continue;
        }
        tokens.extend(raw.unicode_words().map(str::to_string));
    }
    tokens
}

fn has_interior_dot(token: &str) -> bool {
    match token.find('.') {
        Some(i) => i > 0 && i < token.len() - 1,
        None => false,
    }
}
