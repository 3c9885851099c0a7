//! Command dispatch: bridges CLI args -> core session -> output formatting.

pub mod config_cmd;
pub mod probe;
pub mod set;
pub mod show;
pub mod usage;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Probe => probe::handle(target, global).await,
        Command::Show(args) => show::handle(target, args, global).await,
        Command::Usage => usage::handle(target, global).await,
        Command::Set(args) => set::handle(target, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
