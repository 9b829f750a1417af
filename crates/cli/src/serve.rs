//! The demo server behind `oc-assuan serve`.

use std::io::Write;

use logging::trace_cmd;
use protocol::{AssuanError, ErrorCode};
use session::Session;
use transport::PipeServer;

use crate::{EXIT_COMMAND_FAILED, EXIT_CONNECT_FAILED, EXIT_SUCCESS};

/// Largest answer accepted by `ASKDATA`.
pub const ASKDATA_LIMIT: usize = 64 * 1024;

/// Registers the demo commands on a server session.
///
/// | Command | Effect |
/// |---|---|
/// | `ECHO <text>` | sends `<text>` back as data |
/// | `GETINFO version` | sends the package version as data |
/// | `GETINFO pid` | sends the server's process id as data |
/// | `ASKDATA [<keyword>]` | inquires `<keyword>` (default `DATA`) and sends the answer back |
///
/// Options are accepted and logged.
pub fn register_demo_commands(session: &mut Session) -> Result<(), AssuanError> {
    session.register_command("ECHO", |session, args| session.send_data(args.as_bytes()))?;
    session.register_command("GETINFO", getinfo)?;
    session.register_command("ASKDATA", askdata)?;
    session.register_option_handler(|_, key, value| {
        trace_cmd!(key, value, "option accepted");
        Ok(())
    });
    Ok(())
}

fn getinfo(session: &mut Session, args: &str) -> Result<(), AssuanError> {
    match args.trim_end() {
        "version" => session.send_data(env!("CARGO_PKG_VERSION").as_bytes()),
        "pid" => session.send_data(std::process::id().to_string().as_bytes()),
        "" => Err(AssuanError::with_text(
            ErrorCode::SyntaxError,
            "argument required",
        )),
        _ => Err(AssuanError::with_text(
            ErrorCode::ParameterError,
            "unknown value for WHAT",
        )),
    }
}

fn askdata(session: &mut Session, args: &str) -> Result<(), AssuanError> {
    let keyword = args.split_whitespace().next().unwrap_or("DATA");
    let answer = session.inquire(keyword, Some(ASKDATA_LIMIT))?;
    session.send_data(&answer)
}

pub(crate) fn run_serve<Err: Write>(hello: Option<&str>, stderr: &mut Err) -> i32 {
    let mut server = match PipeServer::from_stdio() {
        Ok(server) => server,
        Err(err) => {
            let _ = writeln!(stderr, "oc-assuan: {err}");
            return EXIT_CONNECT_FAILED;
        }
    };

    let session = server.session_mut();
    session.set_hello_line(hello);
    if let Err(err) = register_demo_commands(session) {
        let _ = writeln!(stderr, "oc-assuan: {err}");
        return EXIT_COMMAND_FAILED;
    }

    match server.run() {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            let _ = writeln!(stderr, "oc-assuan: {err}");
            EXIT_COMMAND_FAILED
        }
    }
}
