#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `session` drives one Assuan conversation over a pair of
//! [`pipe_io::PipeDevice`]s. Server sessions read command lines, dispatch
//! them to registered handlers and answer every command with exactly one
//! `OK` or `ERR` line. Client sessions send commands and route the
//! responses to callbacks.
//!
//! # Design
//!
//! - [`Session`] owns both devices, the line buffer for inbound bytes and
//!   the per-command state (okay text, confidentiality, pending data).
//! - [`CommandTable`] maps names to [`CommandHandler`]s, trying the exact
//!   name before a case-insensitive match. Server sessions start with the
//!   [`BUILTIN_COMMANDS`].
//! - Hooks registered on the session observe `BYE`, `RESET`, `CANCEL`,
//!   `OPTION`, `INPUT`, `OUTPUT` and the end of every command.
//! - Handlers may suspend a command with [`Session::defer_completion`] or
//!   [`Session::inquire_ext`]; [`Session::process_next`] keeps feeding lines
//!   without blocking.
//! - [`Transaction`] collects the client callbacks for
//!   [`Session::transact`].
//!
//! # Invariants
//!
//! - A new command is dispatched only when no other command is in progress;
//!   otherwise it is discarded and reported as `Nested commands`.
//! - Okay text and the confidential flag are reset after every command.
//! - Handler failures become `ERR` lines and never end the session; only
//!   `BYE`, peer EOF or a transport error do.
//!
//! # Examples
//!
//! ```no_run
//! use pipe_io::PipeDevice;
//! use session::Session;
//!
//! # fn serve(inbound: PipeDevice, outbound: PipeDevice) -> Result<(), protocol::AssuanError> {
//! let mut session = Session::server(inbound, outbound);
//! session.register_command("ECHO", |session, args| {
//!     session.send_data(args.as_bytes())
//! })?;
//! session.accept()?;
//! session.process()?;
//! # Ok(())
//! # }
//! ```

mod builtins;
mod commands;
mod data;
mod fd;
mod hooks;
mod inquire;
mod session;
mod transact;

pub use builtins::{BUILTIN_COMMANDS, builtin_handler, parse_fd, parse_option};
pub use commands::{CommandHandler, CommandTable};
pub use data::DataWriter;
pub use hooks::{LineHook, NotifyHook, OptionHook, PostCommandHook};
pub use inquire::InquireContinuation;
pub use session::{DEFAULT_HELLO, ProcessStatus, Role, Session};
pub use transact::Transaction;
