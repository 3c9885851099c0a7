//! Async SSH transport for embedded routers.
//!
//! Wraps [`russh`] behind a small [`Transport`]/[`Connector`] seam so that the
//! session logic in `nvtuner-core` never depends on a live router:
//!
//! - **[`RusshConnector`]**: opens a session, authenticates with a password
//!   or a private key file, and hands back a boxed [`Transport`].
//! - **[`Transport`]**: `exec` a command and capture stdout/stderr/exit
//!   status, send a keep-alive, disconnect.
//! - **[`ErrorSink`]**: channel on which the transport reports failures that
//!   happen between calls (remote hang-ups, keep-alive timeouts).

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;

pub use auth::{SshAuth, load_private_key};
pub use client::{RusshConnector, RusshTransport};
pub use error::Error;
pub use transport::{CommandOutput, ConnectParams, Connector, ErrorSink, Transport, TransportConfig};
