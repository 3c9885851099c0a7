//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use nvtuner_config::ConfigError;
use nvtuner_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to router '{router}'")]
    #[diagnostic(
        code(nvtuner::connection_failed),
        help(
            "{reason}\n\
             Check that SSH is enabled on the router (Administration > System)\n\
             and that the address and port are right. Try: nvtuner probe"
        )
    )]
    ConnectionFailed { router: String, reason: String },

    #[error("SSH connection timed out after {seconds}s")]
    #[diagnostic(
        code(nvtuner::timeout),
        help("Increase the timeout with --timeout or check that the router is reachable.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(nvtuner::auth_failed),
        help(
            "{message}\n\
             Run: nvtuner config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for router '{router}'")]
    #[diagnostic(
        code(nvtuner::no_credentials),
        help(
            "Set a username with: nvtuner config set username <name>\n\
             Store a password with: nvtuner config set-password\n\
             Or set NVTUNER_USERNAME / NVTUNER_PASSWORD."
        )
    )]
    NoCredentials { router: String },

    #[error("Private SSH key not found at {}", path.display())]
    #[diagnostic(
        code(nvtuner::key_not_found),
        help("Point --key-dir (or key_dir in the profile) at the folder holding id_rsa.")
    )]
    KeyNotFound { path: PathBuf },

    // ── Variables ────────────────────────────────────────────────────

    #[error("Variable '{name}' not found")]
    #[diagnostic(
        code(nvtuner::not_found),
        help("Run: nvtuner show --filter <text> to search variable names")
    )]
    VariableNotFound { name: String },

    #[error("Router rejected the operation ({code}): {message}")]
    #[diagnostic(code(nvtuner::router))]
    Router { code: String, message: String },

    #[error("Commit failed")]
    #[diagnostic(
        code(nvtuner::commit_failed),
        help(
            "{reason}\n\
             Changes written before the failure stay on the router."
        )
    )]
    CommitFailed { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nvtuner::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Router '{name}' not found in configuration")]
    #[diagnostic(
        code(nvtuner::router_not_found),
        help(
            "Available routers: {available}\n\
             Create one with: nvtuner config init"
        )
    )]
    RouterNotFound { name: String, available: String },

    #[error("No router configured")]
    #[diagnostic(
        code(nvtuner::no_config),
        help(
            "Create a profile with: nvtuner config init\n\
             Or pass --host and --user.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(nvtuner::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(nvtuner::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(nvtuner::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::KeyNotFound { .. } => {
                exit_code::AUTH
            }
            Self::VariableNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { router: profile },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ConnectionFailed { host, reason } => Self::ConnectionFailed {
                router: host,
                reason,
            },

            CoreError::NotConnected => Self::ConnectionFailed {
                router: "(disconnected)".into(),
                reason: "Router connection was lost".into(),
            },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },

            CoreError::KeyNotFound { path } => Self::KeyNotFound { path },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::VariableNotFound { name } => Self::VariableNotFound { name },

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::VariantMismatch { name, .. } | CoreError::WorkingSetExhausted { name } => {
                Self::Validation {
                    field: name,
                    reason: message,
                }
            }

            CoreError::CommitFailed { .. } => Self::CommitFailed { reason: message },

            CoreError::AlreadyConnected { .. } => Self::Router {
                code: "already_connected".into(),
                message,
            },

            CoreError::MalformedVariable { .. } => Self::Router {
                code: "malformed_variable".into(),
                message,
            },

            CoreError::Serialization(e) => Self::Json(e),

            CoreError::Internal(_) => Self::Router {
                code: "internal".into(),
                message,
            },
        }
    }
}
