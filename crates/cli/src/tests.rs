use super::*;
use command::ParsedArgs;
use pipe_io::PipeDevice;
use protocol::ErrorCode;
use session::{Session, Transaction};
use std::io;
use std::thread;

fn run_with(args: &[&str]) -> (i32, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args.iter().copied(), &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8(stdout).expect("utf-8 stdout"),
        String::from_utf8(stderr).expect("utf-8 stderr"),
    )
}

fn parse(args: &[&str]) -> ParsedArgs {
    parse_args(args.iter().copied()).expect("parse")
}

#[test]
fn help_goes_to_stdout() {
    let (code, stdout, stderr) = run_with(&["oc-assuan", "--help"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(stdout, HELP_TEXT);
    assert!(stderr.is_empty());
}

#[test]
fn help_is_recognised_after_a_subcommand() {
    let (code, stdout, _) = run_with(&["oc-assuan", "serve", "-h"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert!(stdout.contains("Usage: oc-assuan"));
}

#[test]
fn version_reports_package_version() {
    let (code, stdout, _) = run_with(&["oc-assuan", "-V"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(stdout, format!("oc-assuan {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let (code, stdout, stderr) = run_with(&["oc-assuan"]);
    assert_eq!(code, EXIT_USAGE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Commands:"));
}

#[test]
fn unknown_option_is_a_usage_error() {
    let (code, _, stderr) = run_with(&["oc-assuan", "--frobnicate"]);
    assert_eq!(code, EXIT_USAGE);
    assert!(stderr.contains("--frobnicate"));
}

#[test]
fn unknown_debug_flag_is_a_usage_error() {
    let (code, _, stderr) = run_with(&["oc-assuan", "--debug", "bogus", "serve"]);
    assert_eq!(code, EXIT_USAGE);
    assert!(stderr.contains("bogus"));
}

#[test]
fn serve_arguments_are_parsed() {
    let parsed = parse(&["oc-assuan", "serve", "-vv", "--hello", "hi there"]);
    assert_eq!(parsed.verbose, 2);
    assert_eq!(
        parsed.mode,
        Some(Mode::Serve {
            hello: Some("hi there".to_owned())
        })
    );
}

#[test]
fn connect_keeps_server_arguments_verbatim() {
    let parsed = parse(&[
        "oc-assuan",
        "--debug",
        "proto2",
        "connect",
        "-c",
        "NOP",
        "--command",
        "GETINFO version",
        "server",
        "--flag",
        "-x",
    ]);
    assert_eq!(parsed.debug, ["proto2"]);
    let Some(Mode::Connect {
        program,
        args,
        commands,
        inquire_answer,
        server_stderr,
    }) = parsed.mode
    else {
        panic!("expected connect mode");
    };
    assert_eq!(program, "server");
    assert_eq!(args, ["--flag", "-x"]);
    assert_eq!(commands, ["NOP", "GETINFO version"]);
    assert_eq!(inquire_answer, None);
    assert!(!server_stderr);
}

#[test]
fn connect_requires_a_program() {
    let (code, _, _) = run_with(&["oc-assuan", "connect", "-c", "NOP"]);
    assert_eq!(code, EXIT_USAGE);
}

/// Runs the demo server on a thread and hands a connected client to `body`.
fn with_demo_server(body: impl FnOnce(&mut Session)) {
    let (command_read, command_write) = io::pipe().expect("command pipe");
    let (response_read, response_write) = io::pipe().expect("response pipe");
    let server = thread::spawn(move || {
        let mut server = Session::server(
            PipeDevice::from_pipe_reader(command_read),
            PipeDevice::from_pipe_writer(response_write),
        );
        register_demo_commands(&mut server).expect("register");
        server.accept().expect("accept");
        server.process().expect("process");
    });

    let mut client = Session::client(
        PipeDevice::from_pipe_reader(response_read),
        PipeDevice::from_pipe_writer(command_write),
    );
    client.read_hello().expect("hello");
    body(&mut client);
    drop(client);
    server.join().expect("server thread");
}

fn data_of(client: &mut Session, command: &str) -> Result<Vec<u8>, protocol::AssuanError> {
    let mut data = Vec::new();
    client.transact(
        command,
        Transaction::new()
            .on_data(|chunk| {
                data.extend_from_slice(chunk);
                Ok(())
            })
            .on_inquire(|keyword, _| Ok(format!("answer to {keyword}").into_bytes())),
    )?;
    Ok(data)
}

#[test]
fn demo_commands_answer_with_data() {
    with_demo_server(|client| {
        assert_eq!(data_of(client, "ECHO hello world").expect("echo"), b"hello world");
        assert_eq!(
            data_of(client, "GETINFO version").expect("version"),
            env!("CARGO_PKG_VERSION").as_bytes()
        );
        assert_eq!(
            data_of(client, "GETINFO pid").expect("pid"),
            std::process::id().to_string().as_bytes()
        );
        assert_eq!(
            data_of(client, "ASKDATA PASSPHRASE").expect("askdata"),
            b"answer to PASSPHRASE"
        );
        assert_eq!(
            data_of(client, "ASKDATA").expect("default keyword"),
            b"answer to DATA"
        );
        assert_eq!(data_of(client, "OPTION ttyname=/dev/tty").expect("option"), b"");
    });
}

#[test]
fn getinfo_rejects_unknown_topics() {
    with_demo_server(|client| {
        let err = data_of(client, "GETINFO colour").expect_err("unknown topic");
        assert_eq!(err.code(), ErrorCode::ParameterError);
        let err = data_of(client, "GETINFO").expect_err("missing topic");
        assert_eq!(err.code(), ErrorCode::SyntaxError);
    });
}

#[cfg(unix)]
mod connect {
    use super::*;

    const STUB_SERVER: &str = r#"echo "OK stub"
while read -r line; do
  case "$line" in
    NOP) echo OK ;;
    GETINFO*) echo "S PROGRESS 1"; echo "D hi+there%0A"; echo OK ;;
    ASK*) echo "INQUIRE SECRET"; read -r data; read -r done; echo "D got:${data#D }"; echo OK ;;
    BYE) echo "OK closing connection"; exit 0 ;;
    *) echo "ERR 103 Unknown command" ;;
  esac
done"#;

    #[test]
    fn prints_data_and_status_lines() {
        let (code, stdout, stderr) = run_with(&[
            "oc-assuan",
            "connect",
            "-c",
            "NOP",
            "-c",
            "GETINFO version",
            "sh",
            "-c",
            STUB_SERVER,
        ]);
        assert_eq!(code, EXIT_SUCCESS, "{stderr}");
        assert_eq!(stdout, "S PROGRESS 1\nhi there\n");
    }

    #[test]
    fn answers_inquiries_with_the_configured_text() {
        let (code, stdout, stderr) = run_with(&[
            "oc-assuan",
            "connect",
            "-c",
            "ASK",
            "--inquire-answer",
            "s3cret",
            "sh",
            "-c",
            STUB_SERVER,
        ]);
        assert_eq!(code, EXIT_SUCCESS, "{stderr}");
        assert_eq!(stdout, "got:s3cret");
    }

    #[test]
    fn stops_at_the_first_error() {
        let (code, stdout, stderr) = run_with(&[
            "oc-assuan",
            "connect",
            "-c",
            "FROB",
            "-c",
            "GETINFO version",
            "sh",
            "-c",
            STUB_SERVER,
        ]);
        assert_eq!(code, EXIT_COMMAND_FAILED);
        assert!(stdout.is_empty());
        assert!(stderr.contains("FROB"), "{stderr}");
        assert!(stderr.contains("Unknown command"), "{stderr}");
    }

    #[test]
    fn refused_greeting_is_a_connect_failure() {
        let (code, _, stderr) = run_with(&[
            "oc-assuan",
            "connect",
            "-c",
            "NOP",
            "sh",
            "-c",
            "echo 'ERR 1 not today'",
        ]);
        assert_eq!(code, EXIT_CONNECT_FAILED);
        assert!(stderr.contains("Connect failed"), "{stderr}");
    }

    #[test]
    fn missing_program_is_a_connect_failure() {
        let (code, _, _) = run_with(&[
            "oc-assuan",
            "connect",
            "-c",
            "NOP",
            "/nonexistent/oc-assuan-test-server",
        ]);
        assert_eq!(code, EXIT_CONNECT_FAILED);
    }
}
