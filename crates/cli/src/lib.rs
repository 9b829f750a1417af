#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `oc-assuan` command-line front-end. `serve` runs a
//! small demo server on the process' stdin and stdout; `connect` spawns any
//! pipe server, sends the requested commands and prints what comes back.
//!
//! # Design
//!
//! [`run`] takes the argument list and handles for standard output and
//! error, so the binary and the tests drive the same code. A
//! [`clap`](https://docs.rs/clap/) builder recognises the subcommands and the
//! global `--help`, `--version`, `-v` and `--debug` flags; help and version
//! text are static.
//!
//! # Invariants
//!
//! - `run` never panics; failures surface as exit codes.
//! - Diagnostics go to stderr. In `serve` mode stdout carries protocol
//!   traffic only.
//!
//! # Errors
//!
//! | Exit code | Meaning |
//! |---|---|
//! | [`EXIT_SUCCESS`] | every command succeeded |
//! | [`EXIT_COMMAND_FAILED`] | a command returned `ERR` or the server loop failed |
//! | [`EXIT_CONNECT_FAILED`] | the server could not be started or refused the connection |
//! | [`EXIT_USAGE`] | the command line could not be parsed |
//!
//! # Examples
//!
//! ```
//! use cli::run;
//!
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = run(["oc-assuan", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("oc-assuan "));
//! assert!(stderr.is_empty());
//! ```

use std::ffi::OsString;
use std::io::Write;

use logging::{VerbosityConfig, init_tracing};

mod client;
mod command;
mod serve;

pub use serve::{ASKDATA_LIMIT, register_demo_commands};

use client::{ConnectRequest, run_connect};
use command::{HELP_TEXT, Mode, parse_args};
use serve::run_serve;

/// Every command succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// A command failed.
pub const EXIT_COMMAND_FAILED: i32 = 1;
/// The server could not be started or the handshake failed.
pub const EXIT_CONNECT_FAILED: i32 = 2;
/// The command line was invalid.
pub const EXIT_USAGE: i32 = 3;

/// Runs the CLI using the provided argument iterator and output handles.
///
/// Returns the process exit code.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => {
            let _ = write!(stderr, "{error}");
            return EXIT_USAGE;
        }
    };

    if parsed.show_help {
        return write_or_fail(stdout, HELP_TEXT);
    }
    if parsed.show_version {
        return write_or_fail(stdout, &version_text());
    }

    let mut config = VerbosityConfig::from_verbose_level(parsed.verbose);
    for token in &parsed.debug {
        if let Err(message) = config.apply_debug_flag(token) {
            let _ = writeln!(stderr, "oc-assuan: {message}");
            return EXIT_USAGE;
        }
    }

    let Some(mode) = parsed.mode else {
        let _ = write!(stderr, "{HELP_TEXT}");
        return EXIT_USAGE;
    };
    init_tracing(&config);

    match mode {
        Mode::Serve { hello } => run_serve(hello.as_deref(), stderr),
        Mode::Connect {
            program,
            args,
            commands,
            inquire_answer,
            server_stderr,
        } => run_connect(
            ConnectRequest {
                program,
                args,
                commands,
                inquire_answer,
                server_stderr,
            },
            stdout,
            stderr,
        ),
    }
}

fn version_text() -> String {
    format!("oc-assuan {}\n", env!("CARGO_PKG_VERSION"))
}

fn write_or_fail<Out: Write>(stdout: &mut Out, text: &str) -> i32 {
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => EXIT_SUCCESS,
        Err(_) => EXIT_COMMAND_FAILED,
    }
}

#[cfg(test)]
mod tests;
