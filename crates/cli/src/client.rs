//! `oc-assuan connect`: run commands against a spawned pipe server.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::Write;

use protocol::AssuanError;
use session::Transaction;
use transport::{ConnectOptions, PipeConnection, pipe_connect};

use crate::{EXIT_COMMAND_FAILED, EXIT_CONNECT_FAILED, EXIT_SUCCESS};

pub(crate) struct ConnectRequest {
    pub(crate) program: OsString,
    pub(crate) args: Vec<OsString>,
    pub(crate) commands: Vec<String>,
    pub(crate) inquire_answer: Option<String>,
    pub(crate) server_stderr: bool,
}

pub(crate) fn run_connect<Out, Err>(request: ConnectRequest, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    let options = ConnectOptions::new(request.program)
        .args(request.args)
        .inherit_stderr(request.server_stderr);
    let mut connection = match pipe_connect(&options) {
        Ok(connection) => connection,
        Err(err) => {
            let _ = writeln!(stderr, "oc-assuan: {err}");
            return EXIT_CONNECT_FAILED;
        }
    };

    let mut exit_code = EXIT_SUCCESS;
    for command in &request.commands {
        let outcome = run_command(
            &mut connection,
            command,
            request.inquire_answer.as_deref(),
            stdout,
        );
        if let Err(err) = outcome {
            let _ = writeln!(stderr, "oc-assuan: {command}: {err}");
            exit_code = EXIT_COMMAND_FAILED;
            break;
        }
    }
    let _ = stdout.flush();

    if let Err(err) = connection.disconnect() {
        tracing::warn!(target: "assuan::connect", error = %err, "disconnect failed");
    }
    exit_code
}

/// Prints `D` payloads raw and `S` lines as `S KEYWORD TEXT`.
fn run_command<Out: Write>(
    connection: &mut PipeConnection,
    command: &str,
    inquire_answer: Option<&str>,
    stdout: &mut Out,
) -> Result<Option<String>, AssuanError> {
    let out = RefCell::new(stdout);
    let mut transaction = Transaction::new()
        .on_data(|chunk| Ok(out.borrow_mut().write_all(chunk)?))
        .on_status(|keyword, text| {
            let mut out = out.borrow_mut();
            if text.is_empty() {
                writeln!(out, "S {keyword}")?;
            } else {
                writeln!(out, "S {keyword} {text}")?;
            }
            Ok(())
        });
    if let Some(answer) = inquire_answer {
        transaction = transaction.on_inquire(move |_, _| Ok(answer.as_bytes().to_vec()));
    }
    connection.transact(command, transaction)
}
