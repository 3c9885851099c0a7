// ── Notification bus ──
//
// Process-wide publish/subscribe channel between the core and the
// presentation layer. Publishing never blocks and never fails: with no
// subscribers a notification is simply dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::model::Nvram;

const BUS_CHANNEL_SIZE: usize = 256;

/// A timestamped line for the presentation layer's log view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            message: message.into(),
        }
    }

    /// `[HH:MM:SS] message`
    pub fn pretty(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Elapsed time since the real session came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTick {
    pub elapsed: Duration,
}

impl ConnectionTick {
    pub fn formatted(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

/// Everything the core announces.
#[derive(Debug, Clone)]
pub enum Notification {
    Log(LogEntry),
    /// A user-facing failure that deserves a dialog, not just a log line.
    DialogError(String),
    VariablesChanged(Arc<Nvram>),
    RouterDisconnected,
    VariableStaged { name: String },
    VariablesUnstaged { names: Vec<String>, abandoned: bool },
    VariableRolledBack { name: String },
    ConnectionTick(ConnectionTick),
    CommandRan { command: String, success: bool },
    /// Forwarded from the transport's asynchronous error channel.
    TransportError(String),
}

/// Cheaply cloneable handle onto the broadcast channel.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CHANNEL_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    /// Publish a log line and mirror it to `tracing`.
    pub fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::new(message);
        info!(target: "nvtuner::log", "{}", entry.message);
        self.publish(Notification::Log(entry));
    }

    pub fn dialog_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "nvtuner::log", "{message}");
        self.publish(Notification::DialogError(message));
    }
}

/// `HH:MM:SS`, hours unbounded (`"27:00:05"` after 27 hours).
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
