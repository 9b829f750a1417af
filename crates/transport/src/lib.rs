#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `transport` sets up Assuan connections over pipes. A client spawns the
//! server with [`pipe_connect`], which wires the child's stdin and stdout to
//! a client [`session::Session`] and checks the `OK` greeting. A server
//! started that way wraps its own stdio with [`PipeServer::from_stdio`].
//!
//! # Design
//!
//! - [`ConnectOptions`] is a builder over [`std::process::Command`]; the
//!   spawned server always gets piped stdin/stdout and the
//!   [`PEER_PID_ENV`] variable.
//! - [`PipeConnection`] owns the child process next to the session and
//!   tears both down on drop.
//!
//! # Errors
//!
//! Failures are [`protocol::AssuanError`] values:
//! [`ErrorCode::ProblemStartingServer`](protocol::ErrorCode::ProblemStartingServer)
//! when a process or stream cannot be set up and
//! [`ErrorCode::ConnectFailed`](protocol::ErrorCode::ConnectFailed) when
//! the handshake does not produce `OK`.
//!
//! # Examples
//!
//! ```no_run
//! use session::Transaction;
//! use transport::{ConnectOptions, pipe_connect};
//!
//! # fn main() -> Result<(), protocol::AssuanError> {
//! let mut connection = pipe_connect(&ConnectOptions::new("oc-assuan").arg("serve"))?;
//! connection.transact("NOP", Transaction::new())?;
//! connection.disconnect()?;
//! # Ok(())
//! # }
//! ```

mod connect;
mod options;
mod server;

pub use connect::{PipeConnection, pipe_connect};
pub use options::{ConnectOptions, PEER_PID_ENV};
pub use server::PipeServer;
