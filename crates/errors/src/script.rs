//! Script parsing error types
//!
//! Every variant carries the 1-based line number of the offending
//! directive so parse failures point at the script source.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("line {line}: malformed directive: {text}")]
    MalformedDirective { line: usize, text: String },

    #[error("line {line}: unsupported directive: {name}")]
    UnsupportedDirective { line: usize, name: String },

    #[error("line {line}: malformed parameter: {token}")]
    MalformedParameter { line: usize, token: String },

    #[error("line {line}: {directive} requires {argument}")]
    MissingArgument {
        line: usize,
        directive: &'static str,
        argument: &'static str,
    },

    #[error("line {line}: invalid machine {address}: {reason}")]
    InvalidMachine {
        line: usize,
        address: String,
        reason: String,
    },

    #[error("line {line}: FROM already declared on line {previous}")]
    FromRedefined { line: usize, previous: usize },

    #[error("line {line}: {message}")]
    InvalidArgument { line: usize, message: String },
}

impl ScriptError {
    /// Line number the error originates from
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedDirective { line, .. }
            | Self::UnsupportedDirective { line, .. }
            | Self::MalformedParameter { line, .. }
            | Self::MissingArgument { line, .. }
            | Self::InvalidMachine { line, .. }
            | Self::FromRedefined { line, .. }
            | Self::InvalidArgument { line, .. } => *line,
        }
    }
}
