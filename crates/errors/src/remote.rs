//! SSH connection and transfer error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("connection to {address} failed: {reason}")]
    DialFailed { address: String, reason: String },

    #[error("SSH handshake with {address} failed: {reason}")]
    HandshakeFailed { address: String, reason: String },

    #[error("authentication as {username} on {address} failed: {reason}")]
    AuthFailed {
        username: String,
        address: String,
        reason: String,
    },

    #[error("remote command on {address} failed: {reason}")]
    ExecFailed { address: String, reason: String },

    #[error("transfer of {path} from {address} failed after {attempts} attempts: {reason}")]
    TransferFailed {
        path: String,
        address: String,
        attempts: u32,
        reason: String,
    },
}

impl RemoteError {
    /// Whether another attempt may succeed. Handshake and
    /// authentication rejections are final; only failures to reach the
    /// machine are worth a backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DialFailed { .. })
    }
}
