use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `nvtuner-ssh` crate.
///
/// Covers every failure mode of the SSH transport: connection setup,
/// authentication, key material, and channel-level execution.
/// `nvtuner-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect or SSH handshake failed.
    #[error("Cannot connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// Connect attempt did not complete in time.
    #[error("Connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The remote end closed the session, or it was torn down locally.
    #[error("Session disconnected: {reason}")]
    Disconnected { reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// Server rejected the offered credentials.
    #[error("Authentication failed for user '{username}'")]
    Authentication { username: String },

    /// Private key file does not exist.
    #[error("Private SSH key not found at {}", path.display())]
    KeyNotFound { path: PathBuf },

    /// Private key exists but could not be decoded.
    #[error("Failed to load private key {}: {reason}", path.display())]
    KeyLoad { path: PathBuf, reason: String },

    // ── Execution ───────────────────────────────────────────────────
    /// Opening or driving an exec channel failed.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Any other protocol-level failure reported by russh.
    #[error("SSH protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if the session is gone and a reconnect is required.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Timeout { .. })
    }

    /// Returns `true` for credential or key problems the user must fix.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::KeyNotFound { .. } | Self::KeyLoad { .. }
        )
    }
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        match err {
            russh::Error::Disconnect => Self::Disconnected {
                reason: "remote closed the connection".into(),
            },
            russh::Error::ConnectionTimeout | russh::Error::InactivityTimeout => {
                Self::Disconnected {
                    reason: err.to_string(),
                }
            }
            other => Self::Protocol(other.to_string()),
        }
    }
}
