//! Argument parsing for `oc-assuan`.

use std::ffi::OsString;

use clap::{Arg, ArgAction, Command, builder::OsStringValueParser};

/// Deterministic help text describing the supported subcommands.
pub(crate) const HELP_TEXT: &str = concat!(
    "oc-assuan ",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "\n",
    "Usage: oc-assuan [-h] [-V] [-v]... [--debug FLAG]... <COMMAND>\n",
    "\n",
    "Commands:\n",
    "  serve      Run a demo Assuan server on stdin/stdout.\n",
    "  connect    Spawn a pipe server and run commands against it.\n",
    "\n",
    "serve options:\n",
    "      --hello TEXT          Greeting sent after the connection opens.\n",
    "\n",
    "connect usage: oc-assuan connect [-c CMD]... [--inquire-answer TEXT] PROGRAM [ARGS]...\n",
    "  -c, --command CMD         Command to send; may be repeated.\n",
    "      --inquire-answer TEXT Data sent back for every INQUIRE.\n",
    "      --server-stderr       Let the server write to this terminal's stderr.\n",
    "\n",
    "Global options:\n",
    "  -h, --help                Show this help message and exit.\n",
    "  -V, --version             Output version information and exit.\n",
    "  -v, --verbose             Increase diagnostics; may be repeated.\n",
    "      --debug FLAG          Enable a debug category (io, proto, cmd, connect, all)\n",
    "                            with an optional level digit, e.g. proto2.\n",
);

/// What the invocation asked for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    Serve {
        hello: Option<String>,
    },
    Connect {
        program: OsString,
        args: Vec<OsString>,
        commands: Vec<String>,
        inquire_answer: Option<String>,
        server_stderr: bool,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) show_help: bool,
    pub(crate) show_version: bool,
    pub(crate) verbose: u8,
    pub(crate) debug: Vec<String>,
    pub(crate) mode: Option<Mode>,
}

fn global_args(command: Command) -> Command {
    command
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase diagnostics; may be repeated.")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .value_name("FLAG")
                .help("Enable a debug category with an optional level.")
                .action(ArgAction::Append)
                .global(true),
        )
}

pub(crate) fn clap_command() -> Command {
    let serve = Command::new("serve")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("hello")
                .long("hello")
                .value_name("TEXT")
                .help("Greeting sent after the connection opens."),
        );

    let connect = Command::new("connect")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("command")
                .long("command")
                .short('c')
                .value_name("CMD")
                .help("Command to send; may be repeated.")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("inquire-answer")
                .long("inquire-answer")
                .value_name("TEXT")
                .help("Data sent back for every INQUIRE."),
        )
        .arg(
            Arg::new("server-stderr")
                .long("server-stderr")
                .help("Let the server write to this terminal's stderr.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            // Everything from PROGRAM on belongs to the server's command line.
            Arg::new("server")
                .value_name("PROGRAM")
                .value_parser(OsStringValueParser::new())
                .num_args(1..)
                .required(true)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        );

    global_args(Command::new("oc-assuan"))
        .disable_help_subcommand(true)
        .subcommand(serve)
        .subcommand(connect)
}

pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();

    if args.is_empty() {
        args.push(OsString::from("oc-assuan"));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;

    // Global flags are visible from the subcommand's matches as well.
    let (flags, mode) = match matches.remove_subcommand() {
        Some((name, mut sub)) => {
            let mode = match name.as_str() {
                "serve" => Mode::Serve {
                    hello: sub.remove_one::<String>("hello"),
                },
                _ => {
                    let mut server = sub
                        .remove_many::<OsString>("server")
                        .into_iter()
                        .flatten();
                    Mode::Connect {
                        program: server.next().unwrap_or_default(),
                        args: server.collect(),
                        commands: sub
                            .remove_many::<String>("command")
                            .map(|values| values.collect())
                            .unwrap_or_default(),
                        inquire_answer: sub.remove_one::<String>("inquire-answer"),
                        server_stderr: sub.get_flag("server-stderr"),
                    }
                }
            };
            (sub, Some(mode))
        }
        None => (matches, None),
    };

    Ok(ParsedArgs {
        show_help: flags.get_flag("help"),
        show_version: flags.get_flag("version"),
        verbose: flags.get_count("verbose"),
        debug: flags
            .get_many::<String>("debug")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        mode,
    })
}
