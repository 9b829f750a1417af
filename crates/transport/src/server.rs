//! Server side bootstrap over inherited pipes.

use std::env;

use logging::trace_connect;
use pipe_io::{OpenMode, PipeDevice, PipeHandle};
use protocol::{AssuanError, ErrorCode};
use session::Session;

use crate::options::PEER_PID_ENV;

/// A server session over a pair of pipes, usually the process' own stdin
/// and stdout as set up by [`pipe_connect`](crate::pipe_connect).
#[derive(Debug)]
pub struct PipeServer {
    session: Session,
}

impl PipeServer {
    /// Serves on duplicates of stdin and stdout.
    ///
    /// The peer pid is taken from `_assuan_pipe_connect_pid` when the
    /// variable holds a valid pid.
    ///
    /// # Errors
    ///
    /// [`ErrorCode::ProblemStartingServer`] when either stream cannot be
    /// duplicated, for instance because it was closed.
    pub fn from_stdio() -> Result<Self, AssuanError> {
        let inbound = PipeHandle::stdin().map_err(|err| problem("stdin", &err))?;
        let outbound = PipeHandle::stdout().map_err(|err| problem("stdout", &err))?;
        let mut server = Self::from_handles(inbound, outbound);
        server.session.set_peer_pid(peer_pid_from_env());
        Ok(server)
    }

    /// Serves on the given handles.
    pub fn from_handles(inbound: impl Into<PipeHandle>, outbound: impl Into<PipeHandle>) -> Self {
        let inbound = PipeDevice::open(inbound, OpenMode::ReadOnly);
        let outbound = PipeDevice::open(outbound, OpenMode::WriteOnly);
        trace_connect!(
            inbound = inbound.descriptor(),
            outbound = outbound.descriptor(),
            "pipe server ready"
        );
        Self {
            session: Session::server(inbound, outbound),
        }
    }

    /// The server session, for registering commands and hooks.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Returns the session.
    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Sends the hello and processes commands until the client leaves.
    pub fn run(&mut self) -> Result<(), AssuanError> {
        self.session.accept()?;
        self.session.process()
    }
}

fn problem(stream: &str, err: &std::io::Error) -> AssuanError {
    AssuanError::with_text(
        ErrorCode::ProblemStartingServer,
        format!("cannot use {stream}: {err}"),
    )
}

fn peer_pid_from_env() -> Option<u32> {
    parse_peer_pid(&env::var(PEER_PID_ENV).ok()?)
}

fn parse_peer_pid(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|&pid| pid != 0)
}
