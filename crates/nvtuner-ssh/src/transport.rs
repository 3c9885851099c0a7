// Transport seam shared by the real SSH client and test doubles.
//
// `nvtuner-core` only ever talks to a `Box<dyn Transport>` handed out by a
// `Connector`, so the session manager can be driven against a scripted
// router in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::SshAuth;
use crate::error::Error;

/// Connection tuning for a single SSH session.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on TCP connect + handshake + authentication.
    pub connect_timeout: Duration,
    /// Protocol-level keep-alive interval. `None` disables it.
    pub keepalive_interval: Option<Duration>,
    /// Drop the session after this much silence. `None` waits forever.
    pub inactivity_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            keepalive_interval: Some(Duration::from_secs(60)),
            inactivity_timeout: None,
        }
    }
}

/// Everything needed to open one session.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub auth: SshAuth,
    pub transport: TransportConfig,
}

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the remote never reported an exit status.
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Stdout with trailing CR/LF removed (single-line commands like `hostname`).
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim_end_matches(['\r', '\n'])
    }
}

/// Sink the transport uses to report failures that happen outside any call,
/// e.g. the router dropping the connection while idle.
pub type ErrorSink = mpsc::UnboundedSender<Error>;

/// A live, authenticated session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one command to completion and capture its output.
    async fn exec(&self, command: &str) -> Result<CommandOutput, Error>;

    /// Prove the session is still alive.
    async fn keepalive(&self) -> Result<(), Error>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<(), Error>;
}

/// Factory for authenticated sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectParams,
        errors: ErrorSink,
    ) -> Result<Box<dyn Transport>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_trimmed_strips_line_endings() {
        let out = CommandOutput {
            stdout: "RT-AX88U\r\n".into(),
            stderr: String::new(),
            exit_status: Some(0),
        };
        assert_eq!(out.stdout_trimmed(), "RT-AX88U");
        assert!(out.success());
    }

    #[test]
    fn default_output_is_not_success() {
        assert!(!CommandOutput::default().success());
    }
}
