//! End-to-end checks of the `oc-assuan` binary, with the binary acting as
//! both the pipe client and the server it spawns.

use assert_cmd::Command;
use std::process::Output;

const BIN: &str = env!("CARGO_BIN_EXE_oc-assuan");

fn oc_assuan() -> Command {
    let mut command = Command::new(BIN);
    command.env_remove("OC_ASSUAN_LOG");
    command
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is UTF-8")
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).expect("stderr is UTF-8")
}

#[test]
fn help_lists_usage() {
    let output = oc_assuan().arg("--help").output().expect("run --help");
    assert!(output.status.success(), "--help should succeed");
    assert!(
        output.stderr.is_empty(),
        "help output should not write to stderr"
    );
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Usage: oc-assuan"));
    assert!(stdout.contains("connect"));
    assert!(stdout.contains("serve"));
}

#[test]
fn version_names_the_binary() {
    let output = oc_assuan().arg("--version").output().expect("run --version");
    assert!(output.status.success());
    assert_eq!(
        stdout_of(&output),
        format!("oc-assuan {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn usage_errors_exit_with_three() {
    let output = oc_assuan()
        .arg("--definitely-not-a-flag")
        .output()
        .expect("run with unknown flag");
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr_of(&output).contains("--definitely-not-a-flag"));

    let output = oc_assuan().output().expect("run without subcommand");
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr_of(&output).contains("Usage:"));
}

#[test]
fn serve_speaks_the_protocol_on_stdio() {
    let output = oc_assuan()
        .args(["serve", "--hello", "ready when you are"])
        .write_stdin("NOP\nECHO hi there\nFROB\nBYE\n")
        .output()
        .expect("run serve");
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(
        stdout_of(&output),
        "OK ready when you are\n\
         OK\n\
         D hi there\n\
         OK\n\
         ERR 103 Unknown command\n\
         OK closing connection\n"
    );
}

#[test]
fn serve_stops_when_the_client_hangs_up() {
    let output = oc_assuan()
        .arg("serve")
        .write_stdin("NOP\n")
        .output()
        .expect("run serve");
    assert!(output.status.success(), "{}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("OK "), "{stdout}");
    assert!(stdout.ends_with("\nOK\n"), "{stdout}");
}

#[test]
fn connect_drives_a_spawned_server() {
    let output = oc_assuan()
        .args([
            "connect",
            "-c",
            "GETINFO version",
            "-c",
            "ECHO hi",
            BIN,
            "serve",
        ])
        .output()
        .expect("run connect");
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output), format!("{}hi", env!("CARGO_PKG_VERSION")));
}

#[test]
fn connect_answers_inquiries() {
    let output = oc_assuan()
        .args([
            "connect",
            "--inquire-answer",
            "open sesame",
            "-c",
            "ASKDATA PASSPHRASE",
            BIN,
            "serve",
        ])
        .output()
        .expect("run connect");
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "open sesame");
}

#[test]
fn connect_reports_server_errors() {
    let output = oc_assuan()
        .args([
            "connect",
            "-c",
            "GETINFO colour",
            "-c",
            "ECHO never",
            BIN,
            "serve",
        ])
        .output()
        .expect("run connect");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("GETINFO colour"), "{stderr}");
    assert!(stderr.contains("Parameter error"), "{stderr}");
}

#[test]
fn connect_without_a_server_fails_to_start() {
    let output = oc_assuan()
        .args(["connect", "-c", "NOP", "/nonexistent/oc-assuan-server"])
        .output()
        .expect("run connect");
    assert_eq!(output.status.code(), Some(2));
}
