//! The per-connection protocol state machine.

use std::io::Write;
use std::sync::Arc;

use logging::{log_tag, render_line, trace_cmd, trace_proto};
use pipe_io::PipeDevice;
use protocol::{
    AssuanError, ErrorCode, LINE_BUFFER_SIZE, LineBuffer, MAX_LINE_LENGTH, split_command,
};

use crate::builtins;
use crate::commands::{CommandHandler, CommandTable};
use crate::data::DataOutput;
use crate::fd::close_raw;
use crate::hooks::Hooks;
use crate::inquire::PendingInquire;

/// Hello text sent when none has been configured.
pub const DEFAULT_HELLO: &str = "Pleased to meet you";

/// Which end of the conversation a session drives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// Accepts commands and answers them.
    Server,
    /// Sends commands and consumes the answers.
    Client,
}

/// Outcome of one [`Session::process_next`] step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessStatus {
    /// A line was consumed.
    Processed,
    /// No complete line is available yet.
    Pending,
    /// The connection has ended.
    Closed,
}

/// One end of an Assuan conversation over a pair of pipe devices.
///
/// A session is driven from a single thread. Server sessions start with the
/// built-in commands registered; handlers receive the session mutably and
/// may write status and data lines, inquire the client, or defer
/// completion.
#[derive(Debug)]
pub struct Session {
    pub(crate) role: Role,
    inbound: PipeDevice,
    outbound: PipeDevice,
    lines: LineBuffer,
    pub(crate) commands: CommandTable,
    pub(crate) hooks: Hooks,
    hello: Option<String>,
    okay_line: Option<String>,
    confidential: bool,
    pipe_mode: bool,
    accepted: bool,
    peer_pid: Option<u32>,
    in_command: bool,
    pub(crate) in_inquire: bool,
    deferred: bool,
    closed: bool,
    input_fd: Option<i64>,
    output_fd: Option<i64>,
    pub(crate) data: DataOutput,
    pub(crate) pending_inquire: Option<PendingInquire>,
}

impl Session {
    fn new(role: Role, inbound: PipeDevice, outbound: PipeDevice) -> Self {
        let mut session = Self {
            role,
            inbound,
            outbound,
            lines: LineBuffer::new(),
            commands: CommandTable::new(),
            hooks: Hooks::default(),
            hello: None,
            okay_line: None,
            confidential: false,
            pipe_mode: true,
            accepted: false,
            peer_pid: None,
            in_command: false,
            in_inquire: false,
            deferred: false,
            closed: false,
            input_fd: None,
            output_fd: None,
            data: DataOutput::default(),
            pending_inquire: None,
        };
        if role == Role::Server {
            builtins::register_all(&mut session.commands);
        }
        session
    }

    /// Creates a server session reading commands from `inbound` and writing
    /// responses to `outbound`.
    pub fn server(inbound: PipeDevice, outbound: PipeDevice) -> Self {
        Self::new(Role::Server, inbound, outbound)
    }

    /// Creates a client session reading responses from `inbound` and writing
    /// commands to `outbound`.
    pub fn client(inbound: PipeDevice, outbound: PipeDevice) -> Self {
        Self::new(Role::Client, inbound, outbound)
    }

    /// The role this session was created with.
    pub const fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn require_server(&self) -> Result<(), AssuanError> {
        match self.role {
            Role::Server => Ok(()),
            Role::Client => Err(AssuanError::new(ErrorCode::NotAServer)),
        }
    }

    pub(crate) fn require_client(&self) -> Result<(), AssuanError> {
        match self.role {
            Role::Client => Ok(()),
            Role::Server => Err(AssuanError::new(ErrorCode::NotAClient)),
        }
    }

    /// Registers `handler` for `name`, replacing a previous handler of the
    /// same exact name (built-ins included).
    pub fn register_command(
        &mut self,
        name: &str,
        handler: impl Fn(&mut Self, &str) -> Result<(), AssuanError> + Send + Sync + 'static,
    ) -> Result<(), AssuanError> {
        self.register_handler(name, Arc::new(handler))
    }

    /// Registers a shared handler object for `name`.
    pub fn register_handler(
        &mut self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), AssuanError> {
        self.require_server()?;
        if name.is_empty() || name.contains([' ', '\t', '\n']) {
            return Err(AssuanError::with_text(
                ErrorCode::InvalidValue,
                "invalid command name",
            ));
        }
        trace_cmd!(command = name, "registering command");
        self.commands.insert(name, handler);
        Ok(())
    }

    /// Registered command names in registration order.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.names()
    }

    /// Sets the hello text sent by [`accept`](Self::accept); `None` restores
    /// [`DEFAULT_HELLO`].
    pub fn set_hello_line(&mut self, hello: Option<&str>) {
        self.hello = hello.map(str::to_owned);
    }

    /// Sets the text of the `OK` line that ends the current command.
    pub fn set_okay_line(&mut self, text: Option<&str>) {
        self.okay_line = text.map(str::to_owned);
    }

    /// Marks the lines of the current command as secret; they are not
    /// logged. Reset after every command.
    pub fn set_confidential(&mut self, confidential: bool) {
        self.confidential = confidential;
    }

    /// Returns `true` while the current command is confidential.
    pub const fn is_confidential(&self) -> bool {
        self.confidential
    }

    /// Records the process id of the peer, when known.
    pub fn set_peer_pid(&mut self, pid: Option<u32>) {
        self.peer_pid = pid;
    }

    /// Process id of the peer, when known.
    pub const fn peer_pid(&self) -> Option<u32> {
        self.peer_pid
    }

    /// Returns `true` while the session can still exchange lines.
    pub const fn is_open(&self) -> bool {
        !self.closed
    }

    /// Returns `true` between dispatching a command and sending its final
    /// response.
    pub const fn in_command(&self) -> bool {
        self.in_command
    }

    /// Descriptor bound by `INPUT`.
    pub const fn input_fd(&self) -> Option<i64> {
        self.input_fd
    }

    /// Descriptor bound by `OUTPUT`.
    pub const fn output_fd(&self) -> Option<i64> {
        self.output_fd
    }

    pub(crate) fn inbound_descriptor(&self) -> Option<i64> {
        self.inbound.descriptor()
    }

    pub(crate) fn outbound_descriptor(&self) -> Option<i64> {
        self.outbound.descriptor()
    }

    pub(crate) fn set_input_fd(&mut self, fd: i64) {
        self.input_fd = Some(fd);
    }

    pub(crate) fn set_output_fd(&mut self, fd: i64) {
        self.output_fd = Some(fd);
    }

    /// Closes the descriptor bound by `INPUT`, if any.
    pub fn close_input(&mut self) -> Result<(), AssuanError> {
        match self.input_fd.take() {
            Some(fd) => {
                trace_cmd!(fd, "closing input descriptor");
                close_raw(fd).map_err(|err| AssuanError::with_text(ErrorCode::General, err.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Closes the descriptor bound by `OUTPUT`, if any.
    pub fn close_output(&mut self) -> Result<(), AssuanError> {
        match self.output_fd.take() {
            Some(fd) => {
                trace_cmd!(fd, "closing output descriptor");
                close_raw(fd).map_err(|err| AssuanError::with_text(ErrorCode::General, err.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Writes one protocol line.
    ///
    /// Lines containing a newline are refused with
    /// [`ErrorCode::InvalidValue`]; lines longer than
    /// [`MAX_LINE_LENGTH`] are cut with a warning.
    pub fn write_line(&mut self, line: &str) -> Result<(), AssuanError> {
        if line.contains(['\n', '\r']) {
            return Err(AssuanError::with_text(
                ErrorCode::InvalidValue,
                "line contains a line terminator",
            ));
        }
        self.write_raw_line(line.as_bytes())
    }

    pub(crate) fn write_raw_line(&mut self, line: &[u8]) -> Result<(), AssuanError> {
        if self.closed {
            return Err(AssuanError::with_text(
                ErrorCode::WriteError,
                "connection closed",
            ));
        }
        let line = if line.len() > MAX_LINE_LENGTH {
            tracing::warn!(
                target: "assuan::proto",
                length = line.len(),
                "{}truncating line to {MAX_LINE_LENGTH} bytes",
                log_tag()
            );
            &line[..MAX_LINE_LENGTH]
        } else {
            line
        };
        trace_proto!("{}-> {}", log_tag(), render_line(line, self.confidential));

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');
        let mut outbound = &self.outbound;
        outbound
            .write_all(&buf)
            .and_then(|()| outbound.flush())
            .map_err(|err| AssuanError::write(&err))
    }

    /// Sends `S <keyword>[ <text>]`.
    pub fn write_status(&mut self, keyword: &str, text: &str) -> Result<(), AssuanError> {
        self.require_server()?;
        if text.is_empty() {
            self.write_line(&format!("S {keyword}"))
        } else {
            self.write_line(&format!("S {keyword} {text}"))
        }
    }

    /// Returns the next line from the peer, or `None` when `block` is false
    /// and no complete line is available.
    pub(crate) fn read_line(&mut self, block: bool) -> Result<Option<Vec<u8>>, AssuanError> {
        loop {
            if let Some(item) = self.lines.next_line() {
                let line = item.map_err(AssuanError::from)?;
                trace_proto!("{}<- {}", log_tag(), render_line(&line, self.confidential));
                return Ok(Some(line));
            }
            if self.closed {
                return Err(AssuanError::eof());
            }
            if !block && self.inbound.read_would_block() {
                return Ok(None);
            }
            let mut buf = [0u8; LINE_BUFFER_SIZE];
            let count = self
                .inbound
                .read(&mut buf)
                .map_err(|err| AssuanError::read(&err))?;
            if count == 0 {
                trace_proto!("{}<- [EOF]", log_tag());
                return Err(match self.lines.finish() {
                    Ok(()) => AssuanError::eof(),
                    Err(err) => err.into(),
                });
            }
            self.lines.extend(&buf[..count]);
        }
    }

    /// Sends the hello line, completing the single accept of pipe mode.
    ///
    /// A second call returns the closed-connection marker. A hello spanning
    /// several lines is sent as comments followed by `OK <last line>`.
    pub fn accept(&mut self) -> Result<(), AssuanError> {
        self.require_server()?;
        if self.accepted && self.pipe_mode {
            return Err(AssuanError::eof());
        }
        self.accepted = true;

        let hello = self.hello.clone().unwrap_or_else(|| DEFAULT_HELLO.to_owned());
        let mut lines: Vec<&str> = hello.split('\n').collect();
        let last = lines.pop().unwrap_or_default();
        for line in lines {
            self.write_line(&format!("# {line}"))?;
        }
        if last.is_empty() {
            self.write_line("OK")
        } else {
            self.write_line(&format!("OK {last}"))
        }
    }

    /// Processes commands until the peer says `BYE` or closes the
    /// connection. Returns the transport error that ended the loop, if any.
    ///
    /// Commands arriving while another one is deferred are discarded and the
    /// loop carries on.
    pub fn process(&mut self) -> Result<(), AssuanError> {
        self.require_server()?;
        loop {
            match self.process_step(true) {
                Ok(ProcessStatus::Closed) => return Ok(()),
                Ok(ProcessStatus::Processed | ProcessStatus::Pending) => {}
                Err(err) if err.code() == ErrorCode::NestedCommands => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Processes at most one line without blocking on the transport.
    ///
    /// Lines answering an [`inquire_ext`](Self::inquire_ext) are fed to its
    /// continuation. A command arriving while another is still deferred is
    /// discarded and reported as [`ErrorCode::NestedCommands`].
    pub fn process_next(&mut self) -> Result<ProcessStatus, AssuanError> {
        self.require_server()?;
        self.process_step(false)
    }

    fn process_step(&mut self, block: bool) -> Result<ProcessStatus, AssuanError> {
        if self.closed {
            return Ok(ProcessStatus::Closed);
        }
        let line = match self.read_line(block) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(ProcessStatus::Pending),
            Err(err) if err.is_eof() => {
                self.finish();
                return Ok(ProcessStatus::Closed);
            }
            Err(err) if err.code() == ErrorCode::LineTooLong => {
                if self.pending_inquire.is_some() {
                    trace_proto!("{}line too long, failing the inquiry", log_tag());
                    self.fail_inquire(err);
                } else if self.in_command {
                    tracing::warn!(
                        target: "assuan::proto",
                        "{}line too long while a command is in progress, discarded",
                        log_tag()
                    );
                } else {
                    trace_proto!("{}line too long, rejected", log_tag());
                    self.write_line(&err.render_err_line())?;
                }
                return Ok(ProcessStatus::Processed);
            }
            Err(err) if err.code() == ErrorCode::LineNotTerminated => {
                self.finish();
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if self.pending_inquire.is_some() {
            self.feed_inquire(&line)?;
            return Ok(self.status_after_step());
        }
        if self.in_command || self.in_inquire {
            tracing::warn!(
                target: "assuan::cmd",
                "{}command received while another is in progress, discarded",
                log_tag()
            );
            return Err(AssuanError::new(ErrorCode::NestedCommands));
        }
        if line.is_empty() || line.first() == Some(&b'#') {
            return Ok(ProcessStatus::Processed);
        }

        self.in_command = true;
        let result = self.dispatch(&line);
        if self.deferred {
            trace_cmd!("command completion deferred");
            return Ok(ProcessStatus::Processed);
        }
        self.complete(result)?;
        Ok(self.status_after_step())
    }

    fn status_after_step(&self) -> ProcessStatus {
        if self.closed {
            ProcessStatus::Closed
        } else {
            ProcessStatus::Processed
        }
    }

    fn dispatch(&mut self, line: &[u8]) -> Result<(), AssuanError> {
        if line.starts_with(b"D ") || line == b"D" {
            trace_cmd!("data line outside an inquiry");
            return Err(AssuanError::new(ErrorCode::NotImplemented));
        }
        let text = std::str::from_utf8(line).map_err(|_| {
            AssuanError::with_text(ErrorCode::SyntaxError, "command line is not valid UTF-8")
        })?;
        let (name, args) = split_command(text)?;
        let Some(handler) = self.commands.lookup(name) else {
            trace_cmd!(command = name, "unknown command");
            return Err(AssuanError::new(ErrorCode::UnknownCommand));
        };
        trace_cmd!(command = name, "dispatching");
        handler.handle(self, args)
    }

    /// Lets the running handler return without finishing its command; the
    /// command is completed later by [`process_done`](Self::process_done).
    pub fn defer_completion(&mut self) -> Result<(), AssuanError> {
        self.require_server()?;
        if !self.in_command {
            return Err(AssuanError::with_text(
                ErrorCode::General,
                "no command in progress",
            ));
        }
        self.deferred = true;
        Ok(())
    }

    /// Finishes a deferred command with `result`.
    pub fn process_done(&mut self, result: Result<(), AssuanError>) -> Result<(), AssuanError> {
        self.require_server()?;
        if !self.in_command {
            return Err(AssuanError::with_text(
                ErrorCode::General,
                "no command in progress",
            ));
        }
        self.complete(result)
    }

    /// Sends the final line of the current command and resets the
    /// per-command state.
    fn complete(&mut self, result: Result<(), AssuanError>) -> Result<(), AssuanError> {
        let flushed = self.flush_data();
        let result = result.and(flushed);

        let written = match &result {
            Ok(()) => match self.okay_line.take() {
                Some(text) if !text.is_empty() => self.write_line(&format!("OK {text}")),
                _ => self.write_line("OK"),
            },
            Err(err) if err.is_eof() => {
                let written = self.write_line("OK closing connection");
                self.finish();
                written
            }
            Err(err) => {
                trace_cmd!(error = %err, "command failed");
                self.write_line(&err.render_err_line())
            }
        };

        let post_command = self.hooks.post_command.clone();
        if let Some(hook) = post_command {
            hook(self, &result);
        }

        self.confidential = false;
        self.okay_line = None;
        self.in_command = false;
        self.deferred = false;
        written
    }

    /// Ends the connection: closes the auxiliary descriptors and the
    /// outbound device so the peer sees EOF. Later calls do nothing.
    ///
    /// The inbound device is released when the session is dropped; its
    /// reader thread exits once the peer closes its end.
    pub fn finish(&mut self) {
        if self.closed {
            return;
        }
        trace_proto!("{}finishing connection", log_tag());
        let _ = self.close_input();
        let _ = self.close_output();
        self.closed = true;
        self.outbound.close();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish();
        self.inbound.close();
    }
}
