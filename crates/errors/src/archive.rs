//! Archive packaging error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    #[error("archive source {path} is not an absolute path")]
    NotAbsolute { path: String },

    #[error("archive source {path} does not exist")]
    SourceMissing { path: String },

    #[error("failed to create archive {path}: {reason}")]
    CreateFailed { path: String, reason: String },
}
