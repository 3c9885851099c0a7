//! Router session and NVRAM synchronisation core for nvtuner.
//!
//! Sits between the SSH transport (`nvtuner-ssh`) and a presentation layer
//! (the `nvtuner` CLI):
//!
//! - **[`SessionManager`]** owns the one real session: connect (or probe),
//!   heartbeat, elapsed ticks, transport error forwarding, disconnect.
//! - **[`CommandRunner`]** serializes remote commands on that session.
//! - **[`parse`]** turns an `nvram show` dump into an [`Nvram`] snapshot,
//!   decoding the tuple-encoded reserved variables.
//! - **[`Workspace`]** tracks edits, the staged list and the selection.
//! - **[`Committer`]** renders staged deltas into a script and runs it.
//!
//! Everything the core wants the outside world to know goes out on the
//! [`NotificationBus`].

pub mod commit;
pub mod config;
pub mod defaults;
pub mod diff;
pub mod error;
pub mod event;
pub mod model;
pub mod parse;
pub mod runner;
pub mod script;
pub mod session;
pub mod staging;
pub mod stream;
pub mod validate;
pub mod variables;

// ── Primary re-exports ──────────────────────────────────────────────
pub use commit::{CommitOutcome, Committer};
pub use config::{AuthMode, RemoteCommands, Router, SessionConfig};
pub use defaults::FirmwareDefaults;
pub use diff::{DiffDelimiter, DiffLine, diff_delta, diff_lines};
pub use error::CoreError;
pub use event::{ConnectionTick, LogEntry, Notification, NotificationBus, format_elapsed};
pub use runner::CommandRunner;
pub use script::{build_script, script_file_name};
pub use session::{ConnectionResult, ConnectionState, SessionManager};
pub use staging::Workspace;
pub use stream::{Snapshot, SnapshotStream};
pub use validate::{is_valid_ipv4, is_valid_port, is_valid_port_str};
pub use variables::VariableService;

pub use model::{
    Nvram, NvramUsage, SixTuple, TripleTuple, Variable, VariableDelta, VariableKind,
    VariableKindTag,
};

// Transport types consumers need to build a session.
pub use nvtuner_ssh::{CommandOutput, Connector, RusshConnector};
