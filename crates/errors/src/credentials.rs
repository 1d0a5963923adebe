//! Credential resolution error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("no private key configured for remote machine {machine}")]
    MissingPrivateKey { machine: String },

    #[error("private key {path} is not readable: {reason}")]
    UnreadableKey { path: String, reason: String },

    #[error("unknown user or group identity: {identity}")]
    UnknownIdentity { identity: String },

    #[error("current user could not be determined")]
    NoCurrentUser,
}
