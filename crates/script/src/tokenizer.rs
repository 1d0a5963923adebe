//! Quote-aware argument tokenization
//!
//! Splits raw directive arguments on whitespace outside quotes. A quote
//! that opens a word is stripped; a quote that starts mid-word (the
//! run-in case, `abc"def ghi"`) is retained verbatim while still
//! grouping the quoted span into one word. The opposite quote character
//! is always kept as-is inside a quoted span. An unterminated quote is
//! not an error; the remainder flushes as the final word.

use regex::Regex;

const QUOTE_CHARS: [char; 2] = ['"', '\''];

/// Split a raw argument string into quote-aware words.
#[must_use]
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut keep_quote = false;

    for ch in raw.chars() {
        match quote {
            Some(open) => {
                if ch == open {
                    if keep_quote {
                        word.push(ch);
                    }
                    quote = None;
                } else {
                    word.push(ch);
                }
            }
            None => {
                if QUOTE_CHARS.contains(&ch) {
                    // A quote opening mid-word is retained; one opening a
                    // fresh word is stripped.
                    keep_quote = !word.is_empty();
                    if keep_quote {
                        word.push(ch);
                    }
                    quote = Some(ch);
                } else if ch.is_whitespace() {
                    if !word.is_empty() {
                        words.push(std::mem::take(&mut word));
                    }
                } else {
                    word.push(ch);
                }
            }
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Split a `name:value` parameter token.
///
/// Returns `None` when the token is not a well-formed named parameter
/// (the name must be lowercase alphanumeric with `-`/`_`, the value
/// non-empty). The value has one layer of surrounding quotes trimmed.
#[must_use]
pub fn split_named_param(token: &str) -> Option<(String, String)> {
    let re = Regex::new(r"^([a-z0-9_-]+):(.+)$").ok()?;
    let caps = re.captures(token)?;
    let name = caps.get(1)?.as_str().to_string();
    let value = trim_quotes(caps.get(2)?.as_str()).to_string();
    Some((name, value))
}

/// Strip one layer of leading/trailing quote characters.
///
/// The pair does not need to match: `'abc"` trims to `abc`.
#[must_use]
pub fn trim_quotes(value: &str) -> &str {
    let value = value.strip_prefix(QUOTE_CHARS).unwrap_or(value);
    value.strip_suffix(QUOTE_CHARS).unwrap_or(value)
}

/// Whether the value is wrapped in a matching pair of quotes
#[must_use]
pub fn is_quoted(value: &str) -> bool {
    let mut chars = value.chars();
    match (chars.next(), value.chars().next_back()) {
        (Some(first), Some(last)) => {
            value.len() >= 2 && first == last && QUOTE_CHARS.contains(&first)
        }
        _ => false,
    }
}

/// Wrap a value in quotes, picking the character the value does not use
#[must_use]
pub fn quote(value: &str) -> String {
    if value.contains('"') {
        format!("'{value}'")
    } else {
        format!("\"{value}\"")
    }
}

/// Reassemble tokens into a single argument string.
///
/// Tokens containing whitespace are re-quoted so a later `tokenize`
/// round-trips to the same word boundaries. Used for binding positional
/// arguments to a command's default field and for display names.
#[must_use]
pub fn join_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| {
            if token.chars().any(char::is_whitespace) && !is_quoted(token) {
                quote(token)
            } else {
                token.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
