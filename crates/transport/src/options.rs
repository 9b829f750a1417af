//! Spawn configuration for [`pipe_connect`](crate::pipe_connect).

use std::ffi::{OsStr, OsString};
use std::process::{Command, Stdio};

/// Environment variable through which a spawned server learns the pid of the
/// process that started it.
pub const PEER_PID_ENV: &str = "_assuan_pipe_connect_pid";

/// How to start a pipe server.
///
/// ```
/// use transport::ConnectOptions;
///
/// let options = ConnectOptions::new("oc-assuan")
///     .arg("serve")
///     .env("OC_ASSUAN_LOG", "debug")
///     .inherit_stderr(true);
/// assert_eq!(options.program(), "oc-assuan");
/// assert_eq!(options.args_slice().len(), 1);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectOptions {
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    inherit_stderr: bool,
    no_waitpid: bool,
}

impl ConnectOptions {
    /// Starts a configuration running `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            inherit_stderr: false,
            no_waitpid: false,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the server.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Lets the server write to this process' stderr instead of discarding
    /// its diagnostics.
    #[must_use]
    pub const fn inherit_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }

    /// Leaves the server process unreaped when the connection ends.
    #[must_use]
    pub const fn no_waitpid(mut self, no_waitpid: bool) -> Self {
        self.no_waitpid = no_waitpid;
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args_slice(&self) -> &[OsString] {
        &self.args
    }

    /// Returns `true` when the connection will not wait for the server.
    #[must_use]
    pub const fn skips_waitpid(&self) -> bool {
        self.no_waitpid
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .env(PEER_PID_ENV, std::process::id().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if self.inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_pipes_stdio_and_exports_pid() {
        let options = ConnectOptions::new("server").args(["--flag", "value"]);
        let command = options.command();

        assert_eq!(command.get_program(), "server");
        assert_eq!(command.get_args().collect::<Vec<_>>(), ["--flag", "value"]);
        let pid = command
            .get_envs()
            .find(|(key, _)| *key == PEER_PID_ENV)
            .and_then(|(_, value)| value)
            .expect("pid exported");
        assert_eq!(pid, std::process::id().to_string().as_str());
    }

    #[test]
    fn builder_keeps_extra_environment() {
        let options = ConnectOptions::new("server").env("KEY", "value").no_waitpid(true);
        assert!(options.skips_waitpid());
        let command = options.command();
        assert!(
            command
                .get_envs()
                .any(|(key, value)| key == "KEY" && value == Some(OsStr::new("value")))
        );
    }
}
