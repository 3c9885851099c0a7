// ── Command runner ──
//
// Remote commands on the real session go through a single processor task
// that owns the receiving end of an mpsc channel, so concurrent callers
// are served one at a time in the order they were sent.

use std::sync::Arc;

use async_trait::async_trait;
use nvtuner_ssh::{CommandOutput, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::event::{Notification, NotificationBus};

pub(crate) const COMMAND_CHANNEL_SIZE: usize = 64;

/// Anything that can run a remote command on the current session.
///
/// Implemented by [`SessionManager`](crate::SessionManager); the variable
/// service and the committer only ever see this trait.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command. Fails with [`CoreError::NotConnected`] when there
    /// is no live session; transport failures yield an empty output.
    async fn run_command(&self, command: &str) -> Result<CommandOutput, CoreError>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, CoreError> {
        (**self).run_command(command).await
    }
}

pub(crate) struct CommandEnvelope {
    pub command: String,
    pub response_tx: oneshot::Sender<CommandOutput>,
}

/// Serve envelopes until cancelled or every sender is gone. A command
/// already executing when the token fires runs to completion.
pub(crate) async fn command_processor_task(
    transport: Arc<dyn Transport>,
    bus: NotificationBus,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let output = execute(transport.as_ref(), &bus, &envelope.command).await;
                let _ = envelope.response_tx.send(output);
            }
        }
    }
    debug!("command processor stopped");
}

/// Run `command` on `transport`, announcing it on the bus.
///
/// Transport errors are logged and turned into an empty output so that a
/// multi-step caller can carry on.
pub(crate) async fn execute(
    transport: &dyn Transport,
    bus: &NotificationBus,
    command: &str,
) -> CommandOutput {
    match transport.exec(command).await {
        Ok(output) => {
            debug!(command, exit_status = ?output.exit_status, "command ran");
            bus.publish(Notification::CommandRan {
                command: command.to_owned(),
                success: true,
            });
            output
        }
        Err(e) => {
            warn!(command, error = %e, "command failed on transport");
            bus.log(format!("Command '{command}' failed: {e}"));
            bus.publish(Notification::CommandRan {
                command: command.to_owned(),
                success: false,
            });
            CommandOutput::default()
        }
    }
}
