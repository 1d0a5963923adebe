#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for triage
//!
//! This crate provides fine-grained error types organized by domain.
//! Parse and credential errors are fatal before any execution starts;
//! per-action failures are recovered and recorded so a run always
//! produces a best-effort archive.

use thiserror::Error;

pub mod archive;
pub mod credentials;
pub mod exec;
pub mod remote;
pub mod script;

// Re-export all error types at the root
pub use archive::ArchiveError;
pub use credentials::CredentialError;
pub use exec::ExecError;
pub use remote::RemoteError;
pub use script::ScriptError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("exec error: {0}")]
    Exec(#[from] ExecError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, Error>;
