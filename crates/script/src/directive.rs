//! Line-oriented directive scanning and argument mapping

use crate::tokenizer::{join_tokens, split_named_param, tokenize};
use regex::Regex;
use std::collections::HashMap;
use triage_errors::{Error, ScriptError};

/// One scanned script line before typed parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Uppercase directive name
    pub name: String,
    /// Raw argument text after the name
    pub raw: String,
    /// 1-based source line number
    pub line: usize,
}

/// Scan full script text into directives.
///
/// Blank lines and lines whose trimmed form starts with `#` are
/// skipped. Every remaining line must carry an uppercase directive name
/// followed by at least one argument.
///
/// # Errors
///
/// Returns a [`ScriptError`] when a line has no arguments or its first
/// word is not an uppercase directive name.
pub fn scan(text: &str) -> Result<Vec<Directive>, Error> {
    let name_re =
        Regex::new(r"^[A-Z0-9_-]+$").map_err(|e| Error::internal(format!("name regex: {e}")))?;
    let mut directives = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };

        if !name_re.is_match(name) {
            return Err(ScriptError::UnsupportedDirective {
                line,
                name: name.to_string(),
            }
            .into());
        }
        if rest.is_empty() {
            return Err(ScriptError::MalformedDirective {
                line,
                text: trimmed.to_string(),
            }
            .into());
        }

        directives.push(Directive {
            name: name.to_string(),
            raw: rest.to_string(),
            line,
        });
    }

    Ok(directives)
}

/// Named-argument map for one directive.
///
/// Tokens in `name:value` form populate the map directly when `name` is
/// one the directive declares; everything else binds positionally to the
/// directive's default field. This keeps colon-bearing positional values
/// (machine addresses, URLs) out of the named namespace.
#[derive(Debug, Clone)]
pub struct ArgMap {
    values: HashMap<String, String>,
    line: usize,
}

impl ArgMap {
    /// Build the map from a directive's raw arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] for a dangling parameter (`name:` with
    /// no value), positional arguments on a directive without a default
    /// field, or positional arguments alongside an explicit value for
    /// the default field.
    pub fn build(
        directive: &Directive,
        params: &[&str],
        default_param: Option<&str>,
    ) -> Result<Self, Error> {
        let mut values = HashMap::new();
        let mut positional = Vec::new();

        for token in tokenize(&directive.raw) {
            if let Some((name, value)) = split_named_param(&token) {
                if params.contains(&name.as_str()) {
                    values.insert(name, value);
                    continue;
                }
            } else if let Some(name) = token.strip_suffix(':') {
                if params.contains(&name) {
                    return Err(ScriptError::MalformedParameter {
                        line: directive.line,
                        token,
                    }
                    .into());
                }
            }
            positional.push(token);
        }

        if !positional.is_empty() {
            let Some(default) = default_param else {
                return Err(ScriptError::InvalidArgument {
                    line: directive.line,
                    message: format!(
                        "{} does not take positional arguments: {}",
                        directive.name,
                        positional.join(" ")
                    ),
                }
                .into());
            };
            if values.contains_key(default) {
                return Err(ScriptError::InvalidArgument {
                    line: directive.line,
                    message: format!(
                        "{} given both positional arguments and {default}:",
                        directive.name
                    ),
                }
                .into());
            }
            values.insert(default.to_string(), join_tokens(&positional));
        }

        Ok(Self {
            values,
            line: directive.line,
        })
    }

    /// Look up an optional parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Look up a required parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MissingArgument`] when absent.
    pub fn require(&self, directive: &'static str, name: &'static str) -> Result<&str, Error> {
        self.get(name).ok_or_else(|| {
            ScriptError::MissingArgument {
                line: self.line,
                directive,
                argument: name,
            }
            .into()
        })
    }

    /// Source line of the directive this map came from
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}
