// ── Core error types ──
//
// User-facing errors from nvtuner-core. Consumers never see russh or
// channel-level failures directly; the `From<nvtuner_ssh::Error>` impl
// translates transport errors into domain-appropriate variants.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::VariableKindTag;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Client instance is already connected to {router}")]
    AlreadyConnected { router: String },

    #[error("Private SSH key not found at {}", path.display())]
    KeyNotFound { path: PathBuf },

    #[error("Cannot connect to router at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Not connected to a router")]
    NotConnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed value for {name}: segment '{segment}' has {found} field(s), expected {expected}")]
    MalformedVariable {
        name: String,
        segment: String,
        expected: usize,
        found: usize,
    },

    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },

    // ── Staging errors ───────────────────────────────────────────────
    #[error("Cannot pair {name}: original is {original} but edited copy is {edited}")]
    VariantMismatch {
        name: String,
        original: VariableKindTag,
        edited: VariableKindTag,
    },

    #[error("Cannot stage {name}: it is the last variable in the working set")]
    WorkingSetExhausted { name: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Commit step '{step}' failed: {message}")]
    CommitFailed { step: &'static str, message: String },

    // ── Serialization errors ─────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nvtuner_ssh::Error> for CoreError {
    fn from(err: nvtuner_ssh::Error) -> Self {
        match err {
            nvtuner_ssh::Error::Connect { host, port, reason } => CoreError::ConnectionFailed {
                host: format!("{host}:{port}"),
                reason,
            },
            nvtuner_ssh::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            nvtuner_ssh::Error::Disconnected { .. } => CoreError::NotConnected,
            nvtuner_ssh::Error::Authentication { username } => CoreError::AuthenticationFailed {
                message: format!("router rejected credentials for '{username}'"),
            },
            nvtuner_ssh::Error::KeyNotFound { path } => CoreError::KeyNotFound { path },
            nvtuner_ssh::Error::KeyLoad { path, reason } => CoreError::AuthenticationFailed {
                message: format!("cannot load private key {}: {reason}", path.display()),
            },
            nvtuner_ssh::Error::Channel(message) | nvtuner_ssh::Error::Protocol(message) => {
                CoreError::Internal(message)
            }
        }
    }
}
