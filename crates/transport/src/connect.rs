//! Client side bootstrap: spawn a server and complete the handshake.

use std::io;
use std::process::{Child, ExitStatus};

use logging::trace_connect;
use pipe_io::PipeDevice;
use protocol::{AssuanError, ErrorCode};
use session::{Session, Transaction};

use crate::options::ConnectOptions;

/// Starts the server described by `options` and reads its greeting.
///
/// The server's stdin and stdout become the connection's pipes. No
/// connection is returned unless the first non-comment line is `OK`; on any
/// other outcome the pipes are closed and the child is reaped before the
/// error is returned.
///
/// # Errors
///
/// [`ErrorCode::ProblemStartingServer`] when the program cannot be spawned
/// and [`ErrorCode::ConnectFailed`] when the greeting is missing or is not
/// `OK`.
pub fn pipe_connect(options: &ConnectOptions) -> Result<PipeConnection, AssuanError> {
    let program = options.program().to_string_lossy().into_owned();
    let mut child = options.command().spawn().map_err(|err| {
        AssuanError::with_text(
            ErrorCode::ProblemStartingServer,
            format!("failed to start {program}: {err}"),
        )
    })?;
    trace_connect!(pid = child.id(), program = %program, "spawned pipe server");

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(AssuanError::with_text(
            ErrorCode::ProblemStartingServer,
            "server stdio is not piped",
        ));
    };

    let mut session = Session::client(
        PipeDevice::from_child_stdout(stdout),
        PipeDevice::from_child_stdin(stdin),
    );
    session.set_peer_pid(Some(child.id()));
    let mut connection = PipeConnection {
        session,
        child,
        no_waitpid: options.skips_waitpid(),
        hello: None,
    };

    match connection.session.read_hello() {
        Ok(hello) => {
            trace_connect!(hello = ?hello, "connected");
            connection.hello = hello;
            Ok(connection)
        }
        Err(err) => {
            trace_connect!(error = %err, "handshake failed");
            if err.code() == ErrorCode::ConnectFailed {
                Err(err)
            } else {
                Err(AssuanError::with_text(
                    ErrorCode::ConnectFailed,
                    err.to_string(),
                ))
            }
        }
    }
}

/// A client session connected to a server child process.
///
/// Dropping the connection kills the server if it is still running and
/// then closes its pipes. The child is reaped unless
/// [`ConnectOptions::no_waitpid`] was set.
#[derive(Debug)]
pub struct PipeConnection {
    session: Session,
    child: Child,
    no_waitpid: bool,
    hello: Option<String>,
}

impl PipeConnection {
    /// Text of the server's `OK` greeting.
    #[must_use]
    pub fn hello(&self) -> Option<&str> {
        self.hello.as_deref()
    }

    /// Process id of the server.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// The client session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The client session, for transactions.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Runs one command; see [`Session::transact`].
    pub fn transact(
        &mut self,
        command: &str,
        transaction: Transaction<'_>,
    ) -> Result<Option<String>, AssuanError> {
        self.session.transact(command, transaction)
    }

    /// Attempts to retrieve the server's exit status without blocking.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Says `BYE`, closes the pipes and waits for the server to exit.
    ///
    /// Returns `None` instead of an exit status when the connection was
    /// configured not to wait. The pipes are closed even when `BYE` fails;
    /// that failure is returned after the server was reaped.
    pub fn disconnect(mut self) -> Result<Option<ExitStatus>, AssuanError> {
        let farewell = self.session.transact("BYE", Transaction::new());
        self.session.finish();
        trace_connect!(pid = self.child.id(), "disconnecting");

        let status = if self.no_waitpid {
            None
        } else {
            Some(
                self.child
                    .wait()
                    .map_err(|err| AssuanError::with_text(ErrorCode::General, err.to_string()))?,
            )
        };
        farewell?;
        Ok(status)
    }
}

impl Drop for PipeConnection {
    fn drop(&mut self) {
        // Closing the session drains queued writes; a server that stopped
        // reading only lets go of them once it is gone.
        if let Ok(None) = self.child.try_wait() {
            trace_connect!(pid = self.child.id(), "killing pipe server");
            let _ = self.child.kill();
        }
        self.session.finish();

        if !self.no_waitpid {
            let _ = self.child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests;
