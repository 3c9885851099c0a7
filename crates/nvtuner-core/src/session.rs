// ── Session manager ──
//
// Lifecycle of the one real SSH session per process: connect and
// authenticate, heartbeat, per-second elapsed ticks, transport error
// forwarding, command routing, disconnect. Probe connections open their
// own throwaway transport and never touch any of this state.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use nvtuner_ssh::{CommandOutput, ConnectParams, Connector, SshAuth, Transport, TransportConfig};
use secrecy::SecretString;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{AuthMode, Router, SessionConfig};
use crate::error::CoreError;
use crate::event::{ConnectionTick, Notification, NotificationBus};
use crate::runner::{self, COMMAND_CHANNEL_SIZE, CommandEnvelope, CommandRunner};

// ── ConnectionState ──────────────────────────────────────────────

/// Real-session state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConnectionState {
    NotConnected,
    Connecting,
    Connected,
    Error,
}

/// Outcome of [`SessionManager::connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionResult {
    pub success: bool,
    pub hostname: String,
    pub os: String,
}

impl ConnectionResult {
    pub fn failed() -> Self {
        Self::default()
    }
}

// ── SessionManager ───────────────────────────────────────────────

/// Owner of the real session's transport.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Every remote command the
/// rest of the core issues is routed through [`CommandRunner::run_command`]
/// on this type.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    bus: NotificationBus,
    state: watch::Sender<ConnectionState>,
    current: ArcSwapOption<LiveSession>,
    /// Background tasks of the current session. Held for the whole of
    /// connect and disconnect so the two never interleave.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct LiveSession {
    router: Router,
    transport: Arc<dyn Transport>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    cancel: CancellationToken,
    started: Instant,
}

impl SessionManager {
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>, bus: NotificationBus) -> Self {
        let (state, _) = watch::channel(ConnectionState::NotConnected);
        Self {
            inner: Arc::new(SessionInner {
                config,
                connector,
                bus,
                state,
                current: ArcSwapOption::empty(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    // ── Connect ──────────────────────────────────────────────────

    /// Connect to `router`.
    ///
    /// With `probe_only`, a throwaway transport is authenticated, asked
    /// for its hostname and OS, and closed again; the real session is not
    /// consulted. Otherwise the real session is opened and its heartbeat,
    /// tick and error-forwarding tasks are started.
    ///
    /// Network and authentication failures come back as a failed
    /// [`ConnectionResult`]. [`CoreError::AlreadyConnected`] and
    /// [`CoreError::KeyNotFound`] are returned as errors.
    pub async fn connect(
        &self,
        router: &Router,
        probe_only: bool,
    ) -> Result<ConnectionResult, CoreError> {
        router.validate()?;
        if probe_only {
            return self.probe(router).await;
        }

        let mut tasks = self.inner.tasks.lock().await;

        if let Some(live) = self.inner.current.load_full() {
            if live.transport.is_connected() {
                return Err(CoreError::AlreadyConnected {
                    router: live.router.display_name().to_owned(),
                });
            }
            debug!(router = live.router.display_name(), "discarding dead session");
            self.inner.current.store(None);
            live.cancel.cancel();
            for handle in tasks.drain(..) {
                let _ = handle.await;
            }
        }

        let params = self.connect_params(router)?;
        self.inner.state.send_replace(ConnectionState::Connecting);
        info!(router = router.display_name(), host = %params.host, port = params.port, "connecting");

        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let transport: Arc<dyn Transport> =
            match self.inner.connector.connect(&params, error_tx).await {
                Ok(transport) => Arc::from(transport),
                Err(e) => {
                    warn!(router = router.display_name(), error = %e, "connect failed");
                    self.inner.bus.log(format!(
                        "Error during connection to '{}': \"{e}\"",
                        router.display_name()
                    ));
                    self.inner.state.send_replace(ConnectionState::Error);
                    return Ok(ConnectionResult::failed());
                }
            };

        let cancel = CancellationToken::new();
        let started = Instant::now();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        tasks.push(tokio::spawn(runner::command_processor_task(
            Arc::clone(&transport),
            self.inner.bus.clone(),
            command_rx,
            cancel.clone(),
        )));
        tasks.push(tokio::spawn(transport_error_task(
            Arc::clone(&self.inner),
            error_rx,
            cancel.clone(),
        )));
        let keepalive = self.inner.config.keepalive_interval;
        if !keepalive.is_zero() {
            tasks.push(tokio::spawn(heartbeat_task(
                Arc::clone(&transport),
                self.inner.bus.clone(),
                keepalive,
                cancel.clone(),
            )));
        }
        tasks.push(tokio::spawn(tick_task(
            self.inner.bus.clone(),
            self.inner.config.tick_interval,
            started,
            cancel.clone(),
        )));

        self.inner.current.store(Some(Arc::new(LiveSession {
            router: router.clone(),
            transport,
            command_tx,
            cancel,
            started,
        })));
        self.inner.state.send_replace(ConnectionState::Connected);
        drop(tasks);

        let commands = &self.inner.config.commands;
        let hostname = self.first_line_of(&commands.hostname).await;
        let os = self.first_line_of(&commands.os).await;

        self.inner.bus.log(format!("Connected to {hostname}"));
        Ok(ConnectionResult {
            success: true,
            hostname,
            os,
        })
    }

    async fn probe(&self, router: &Router) -> Result<ConnectionResult, CoreError> {
        let params = self.connect_params(router)?;
        let bus = &self.inner.bus;
        debug!(host = %params.host, port = params.port, "probing");

        // Probe errors have nowhere to go once the probe is closed.
        let (error_tx, _error_rx) = mpsc::unbounded_channel();
        let transport = match self.inner.connector.connect(&params, error_tx).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(host = %params.host, error = %e, "probe failed");
                bus.log(format!("Failed to connect using temporary client: {e}"));
                return Ok(ConnectionResult::failed());
            }
        };

        let commands = &self.inner.config.commands;
        let hostname = runner::execute(transport.as_ref(), bus, &commands.hostname)
            .await
            .stdout_trimmed()
            .to_owned();
        let os = runner::execute(transport.as_ref(), bus, &commands.os)
            .await
            .stdout_trimmed()
            .to_owned();

        bus.log(format!(
            "Connected successfully to {hostname} using temporary client. Disconnecting..."
        ));
        if let Err(e) = transport.disconnect().await {
            debug!(error = %e, "probe transport did not close cleanly");
        }

        Ok(ConnectionResult {
            success: true,
            hostname,
            os,
        })
    }

    fn connect_params(&self, router: &Router) -> Result<ConnectParams, CoreError> {
        let username = router
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CoreError::ValidationFailed {
                message: format!("no username configured for {}", router.display_name()),
            })?;

        let auth = match router.auth_mode {
            AuthMode::Password => SshAuth::Password {
                username,
                password: router
                    .password
                    .clone()
                    .unwrap_or_else(|| SecretString::from(String::new())),
            },
            AuthMode::KeyPair => {
                let dir = router
                    .key_dir
                    .as_ref()
                    .ok_or_else(|| CoreError::ValidationFailed {
                        message: format!("no key folder configured for {}", router.display_name()),
                    })?;
                let key_path = dir.join(&self.inner.config.private_key_name);
                if !key_path.is_file() {
                    self.inner.bus.log("Private SSH key not found");
                    return Err(CoreError::KeyNotFound { path: key_path });
                }
                SshAuth::PrivateKey { username, key_path }
            }
        };

        Ok(ConnectParams {
            host: router.address.trim().to_owned(),
            port: router.port,
            auth,
            transport: TransportConfig {
                connect_timeout: self.inner.config.connect_timeout,
                // The heartbeat task owns keep-alives.
                keepalive_interval: None,
                inactivity_timeout: None,
            },
        })
    }

    async fn first_line_of(&self, command: &str) -> String {
        match self.run_command(command).await {
            Ok(output) => output.stdout_trimmed().to_owned(),
            Err(e) => {
                debug!(command, error = %e, "identification command skipped");
                String::new()
            }
        }
    }

    // ── Disconnect ───────────────────────────────────────────────

    /// Stop the background tasks, close the transport and announce it.
    /// Does nothing when there is no real session.
    pub async fn disconnect(&self) {
        let mut tasks = self.inner.tasks.lock().await;
        let Some(live) = self.inner.current.swap(None) else {
            return;
        };

        live.cancel.cancel();
        for handle in tasks.drain(..) {
            let _ = handle.await;
        }

        if let Err(e) = live.transport.disconnect().await {
            debug!(error = %e, "transport did not close cleanly");
        }

        self.inner.state.send_replace(ConnectionState::NotConnected);
        self.inner.bus.log("Disconnected");
        self.inner.bus.publish(Notification::RouterDisconnected);
    }

    // ── State observation ────────────────────────────────────────

    /// Live query of the real session; probe sessions never count.
    pub fn is_connected(&self) -> bool {
        self.inner
            .current
            .load_full()
            .is_some_and(|live| live.transport.is_connected())
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Router of the real session, if any.
    pub fn router(&self) -> Option<Router> {
        self.inner.current.load_full().map(|live| live.router.clone())
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.inner
            .current
            .load_full()
            .map(|live| live.started.elapsed())
    }
}

#[async_trait]
impl CommandRunner for SessionManager {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, CoreError> {
        let live = self
            .inner
            .current
            .load_full()
            .filter(|live| live.transport.is_connected());
        let Some(live) = live else {
            return Err(self.not_run(command));
        };

        let (response_tx, response_rx) = oneshot::channel();
        let envelope = CommandEnvelope {
            command: command.to_owned(),
            response_tx,
        };
        if live.command_tx.send(envelope).await.is_err() {
            return Err(self.not_run(command));
        }

        // The processor drops queued envelopes when the session is torn down.
        response_rx.await.map_err(|_| self.not_run(command))
    }
}

impl SessionManager {
    /// Announce a command that never reached the transport.
    fn not_run(&self, command: &str) -> CoreError {
        debug!(command, "command dropped: no live session");
        self.inner.bus.publish(Notification::CommandRan {
            command: command.to_owned(),
            success: false,
        });
        CoreError::NotConnected
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn heartbeat_task(
    transport: Arc<dyn Transport>,
    bus: NotificationBus,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match transport.keepalive().await {
                    Ok(()) => trace!("keep-alive acknowledged"),
                    Err(e) => {
                        warn!(error = %e, "keep-alive failed");
                        bus.publish(Notification::TransportError(e.to_string()));
                    }
                }
            }
        }
    }
}

async fn tick_task(
    bus: NotificationBus,
    period: Duration,
    started: Instant,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                bus.publish(Notification::ConnectionTick(ConnectionTick {
                    elapsed: started.elapsed(),
                }));
            }
        }
    }
}

async fn transport_error_task(
    inner: Arc<SessionInner>,
    mut errors: mpsc::UnboundedReceiver<nvtuner_ssh::Error>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            error = errors.recv() => {
                let Some(error) = error else { break };
                warn!(error = %error, "transport reported an error");
                inner.state.send_replace(ConnectionState::Error);
                inner.bus.log(format!("Connection error: {error}"));
                inner.bus.publish(Notification::TransportError(error.to_string()));
            }
        }
    }
}
