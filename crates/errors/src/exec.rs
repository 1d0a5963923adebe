//! Local command execution error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("{command} exited with status {code}")]
    NonZeroExit { command: String, code: i32 },
}
