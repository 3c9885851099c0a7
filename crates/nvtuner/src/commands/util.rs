//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use nvtuner_core::{
    ConnectionResult, Notification, NotificationBus, Nvram, Router, RusshConnector,
    SessionManager, VariableService,
};

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;
use crate::output::Painter;

// ── Session handle ──────────────────────────────────────────────────

/// A session manager plus the spinner and bus renderer that go with it.
pub struct Session {
    pub manager: SessionManager,
    pub bus: NotificationBus,
    spinner: ProgressBar,
    renderer: JoinHandle<()>,
}

impl Session {
    pub fn start(target: &Target, global: &GlobalOpts) -> Self {
        let bus = NotificationBus::new();
        let manager = SessionManager::new(
            target.session.clone(),
            Arc::new(RusshConnector),
            bus.clone(),
        );
        let spinner = spinner(global);
        let renderer = tokio::spawn(render_notifications(
            bus.subscribe(),
            spinner.clone(),
            Painter::new(&global.color),
        ));
        Self {
            manager,
            bus,
            spinner,
            renderer,
        }
    }

    /// Start a session and open the real connection to the target.
    pub async fn open(target: &Target, global: &GlobalOpts) -> Result<Self, CliError> {
        let session = Self::start(target, global);
        match session.connect(&target.router, false).await {
            Ok(_) => Ok(session),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// Connect (or probe), turning a reported failure into an error that
    /// carries the core's own log line as the reason.
    pub async fn connect(
        &self,
        router: &Router,
        probe_only: bool,
    ) -> Result<ConnectionResult, CliError> {
        let mut rx = self.bus.subscribe();
        self.status(format!("Connecting to {}", router.display_name()));

        let result = self.manager.connect(router, probe_only).await?;
        if result.success {
            return Ok(result);
        }
        Err(CliError::ConnectionFailed {
            router: router.display_name().to_owned(),
            reason: last_log(&mut rx).unwrap_or_else(|| "connection failed".into()),
        })
    }

    pub fn status(&self, message: impl Into<String>) {
        self.spinner.set_message(message.into());
    }

    /// Hide the spinner while `f` writes to the terminal.
    pub fn suspend<T>(&self, f: impl FnOnce() -> T) -> T {
        self.spinner.suspend(f)
    }

    pub async fn close(self) {
        self.manager.disconnect().await;
        self.spinner.finish_and_clear();
        self.renderer.abort();
    }
}

/// Run the NVRAM dump through the session and parse it.
pub async fn load_variables(session: &Session, target: &Target) -> Result<Arc<Nvram>, CliError> {
    session.status("Reading NVRAM");
    let service = VariableService::new(
        session.manager.clone(),
        session.bus.clone(),
        target.session.commands.nvram_show.clone(),
    );
    Ok(service.load().await?)
}

// ── Bus rendering ───────────────────────────────────────────────────

fn spinner(global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {prefix:.dim}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Mirror core notifications onto the terminal until aborted.
///
/// Log lines already reach `tracing` through the bus; here they only
/// drive the spinner text.
async fn render_notifications(
    mut rx: broadcast::Receiver<Notification>,
    spinner: ProgressBar,
    painter: Painter,
) {
    loop {
        match rx.recv().await {
            Ok(Notification::Log(entry)) => spinner.set_message(entry.message),
            Ok(Notification::ConnectionTick(tick)) => spinner.set_prefix(tick.formatted()),
            Ok(Notification::TransportError(message)) => spinner.suspend(|| {
                eprintln!("{} {message}", painter.warning("connection:"));
            }),
            Ok(Notification::CommandRan { command, success }) => {
                debug!(command, success, "remote command finished");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "renderer lagged behind the bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Last log message waiting on `rx`.
fn last_log(rx: &mut broadcast::Receiver<Notification>) -> Option<String> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|n| match n {
            Notification::Log(entry) => Some(entry.message),
            _ => None,
        })
        .last()
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Split `NAME=VALUE`. The value may be empty or contain further `=`.
pub fn parse_assignment(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(CliError::Validation {
            field: "assignment".into(),
            reason: format!("expected NAME=VALUE, got '{raw}'"),
        }),
    }
}
