// ── Variable loading ──

use std::sync::Arc;

use chrono::Local;
use tracing::debug;

use crate::defaults::FirmwareDefaults;
use crate::error::CoreError;
use crate::event::{Notification, NotificationBus};
use crate::model::Nvram;
use crate::parse;
use crate::runner::CommandRunner;

/// Fetches and parses the router's NVRAM on demand.
pub struct VariableService<R> {
    runner: R,
    bus: NotificationBus,
    defaults: &'static FirmwareDefaults,
    show_command: String,
}

impl<R: CommandRunner> VariableService<R> {
    pub fn new(runner: R, bus: NotificationBus, show_command: impl Into<String>) -> Self {
        Self {
            runner,
            bus,
            defaults: FirmwareDefaults::bundled(),
            show_command: show_command.into(),
        }
    }

    /// Swap the reference table (tests, custom firmware builds).
    pub fn with_defaults(mut self, defaults: &'static FirmwareDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Dump, parse and announce a fresh snapshot.
    pub async fn load(&self) -> Result<Arc<Nvram>, CoreError> {
        let output = self.runner.run_command(&self.show_command).await?;
        debug!(
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "nvram dump received"
        );

        let nvram = Arc::new(parse::parse_dump(
            &output.stdout,
            &output.stderr,
            self.defaults,
            Local::now(),
        )?);

        self.bus
            .log(format!("{} variables loaded from router", nvram.len()));
        self.bus
            .publish(Notification::VariablesChanged(Arc::clone(&nvram)));
        Ok(nvram)
    }
}
