// russh-backed implementation of the transport seam.
//
// One `RusshTransport` wraps one authenticated `client::Handle`. Each
// `exec` opens a fresh session channel, runs the command, and drains the
// channel until the remote closes it. Callers are expected to serialize
// `exec` calls themselves; the handle tolerates concurrent channels but the
// routers we target do not always.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, DisconnectReason, Handle};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{ChannelMsg, Disconnect};
use secrecy::ExposeSecret;
use tracing::{debug, trace, warn};

use crate::auth::{SshAuth, load_private_key};
use crate::error::Error;
use crate::transport::{CommandOutput, ConnectParams, Connector, ErrorSink, Transport};

/// SSH extended-data stream id for stderr.
const STDERR_EXT: u32 = 1;

// ── Handler ──────────────────────────────────────────────────────

/// russh event handler: accepts the router's host key and forwards
/// unexpected disconnects to the error sink.
struct ClientHandler {
    host: String,
    errors: ErrorSink,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Routers regenerate host keys on every reflash.
        debug!(
            host = %self.host,
            algorithm = %server_public_key.algorithm(),
            "accepting server host key"
        );
        Ok(true)
    }

    async fn disconnected(
        &mut self,
        reason: DisconnectReason<Self::Error>,
    ) -> Result<(), Self::Error> {
        match reason {
            DisconnectReason::ReceivedDisconnect(info) => {
                debug!(host = %self.host, ?info, "remote closed the session");
                let _ = self.errors.send(Error::Disconnected {
                    reason: format!("{info:?}"),
                });
                Ok(())
            }
            DisconnectReason::Error(e) => {
                warn!(host = %self.host, error = %e, "session terminated with error");
                let _ = self.errors.send(Error::Disconnected {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

// ── Connector ────────────────────────────────────────────────────

/// Production [`Connector`] that opens real SSH sessions with russh.
#[derive(Debug, Default, Clone, Copy)]
pub struct RusshConnector;

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(
        &self,
        params: &ConnectParams,
        errors: ErrorSink,
    ) -> Result<Box<dyn Transport>, Error> {
        let timeout = params.transport.connect_timeout;
        let transport = tokio::time::timeout(timeout, open_session(params, errors))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })??;
        Ok(Box::new(transport))
    }
}

async fn open_session(params: &ConnectParams, errors: ErrorSink) -> Result<RusshTransport, Error> {
    let config = client::Config {
        inactivity_timeout: params.transport.inactivity_timeout,
        keepalive_interval: params.transport.keepalive_interval,
        ..Default::default()
    };

    let handler = ClientHandler {
        host: params.host.clone(),
        errors,
    };

    debug!(host = %params.host, port = params.port, "opening SSH session");
    let mut handle = client::connect(
        Arc::new(config),
        (params.host.as_str(), params.port),
        handler,
    )
    .await
    .map_err(|e| Error::Connect {
        host: params.host.clone(),
        port: params.port,
        reason: e.to_string(),
    })?;

    authenticate(&mut handle, &params.auth).await?;
    debug!(host = %params.host, user = params.auth.username(), "authenticated");

    Ok(RusshTransport {
        handle,
        host: params.host.clone(),
    })
}

async fn authenticate(handle: &mut Handle<ClientHandler>, auth: &SshAuth) -> Result<(), Error> {
    let result = match auth {
        SshAuth::Password { username, password } => {
            handle
                .authenticate_password(username.as_str(), password.expose_secret())
                .await?
        }
        SshAuth::PrivateKey { username, key_path } => {
            let key = load_private_key(key_path)?;
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            handle
                .authenticate_publickey(
                    username.as_str(),
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await?
        }
    };

    if result.success() {
        Ok(())
    } else {
        Err(Error::Authentication {
            username: auth.username().to_owned(),
        })
    }
}

// ── Transport ────────────────────────────────────────────────────

/// An authenticated russh session.
pub struct RusshTransport {
    handle: Handle<ClientHandler>,
    host: String,
}

#[async_trait]
impl Transport for RusshTransport {
    async fn exec(&self, command: &str) -> Result<CommandOutput, Error> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_EXT => {
                    stderr.extend_from_slice(data);
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        trace!(
            host = %self.host,
            command,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            ?exit_status,
            "command finished"
        );

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        })
    }

    async fn keepalive(&self) -> Result<(), Error> {
        // An empty channel round-trip is the cheapest request every
        // dropbear/openssh build answers.
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        channel.close().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.handle.is_closed()
    }

    async fn disconnect(&self) -> Result<(), Error> {
        debug!(host = %self.host, "closing SSH session");
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
