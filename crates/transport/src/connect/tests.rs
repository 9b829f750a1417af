use super::*;
use std::time::{Duration, Instant};

/// A shell stand-in for a pipe server that understands `NOP` and `BYE`.
const STUB_SERVER: &str = r#"echo "OK stub ready"
while read -r line; do
  case "$line" in
    NOP) echo OK ;;
    BYE) echo "OK closing connection"; exit 0 ;;
    *) echo "ERR 103 Unknown command" ;;
  esac
done"#;

fn shell(script: &str) -> ConnectOptions {
    ConnectOptions::new("sh").arg("-c").arg(script)
}

#[test]
fn connects_runs_commands_and_disconnects() {
    let mut connection = pipe_connect(&shell(STUB_SERVER)).expect("connect");
    assert_eq!(connection.hello(), Some("stub ready"));
    assert_eq!(connection.session().peer_pid(), Some(connection.pid()));

    assert_eq!(
        connection.transact("NOP", Transaction::new()).expect("nop"),
        None
    );
    let err = connection
        .transact("FROB", Transaction::new())
        .expect_err("unknown");
    assert_eq!(err.code(), ErrorCode::UnknownCommand);

    let status = connection.disconnect().expect("disconnect");
    assert!(status.expect("waited").success());
}

#[test]
fn err_greeting_is_a_connect_failure() {
    let err = pipe_connect(&shell(r#"echo "ERR 1 simulated failure""#))
        .expect_err("refused");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
    assert!(err.text().unwrap_or_default().contains("simulated failure"));
}

#[test]
fn silent_exit_is_a_connect_failure() {
    let err = pipe_connect(&shell("exit 0")).expect_err("no greeting");
    assert_eq!(err.code(), ErrorCode::ConnectFailed);
}

#[test]
fn missing_program_is_reported_synchronously() {
    let err = pipe_connect(&ConnectOptions::new("/nonexistent/oc-assuan-test-server"))
        .expect_err("spawn failure");
    assert_eq!(err.code(), ErrorCode::ProblemStartingServer);
}

#[test]
fn comments_before_the_greeting_are_skipped() {
    let connection =
        pipe_connect(&shell(r"printf '# warming up\nOK\n'; read -r line")).expect("connect");
    assert_eq!(connection.hello(), None);
}

#[test]
fn server_sees_the_parent_pid() {
    let connection = pipe_connect(&shell(
        r#"echo "OK $_assuan_pipe_connect_pid"; read -r line"#,
    ))
    .expect("connect");
    let expected = std::process::id().to_string();
    assert_eq!(connection.hello(), Some(expected.as_str()));
}

#[test]
fn extra_environment_reaches_the_server() {
    let options = shell(r#"echo "OK $STUB_GREETING"; read -r line"#).env("STUB_GREETING", "hi");
    let connection = pipe_connect(&options).expect("connect");
    assert_eq!(connection.hello(), Some("hi"));
}

#[test]
fn dropping_the_connection_stops_a_stuck_server() {
    let connection = pipe_connect(&shell("echo OK; exec sleep 30")).expect("connect");
    let started = Instant::now();
    drop(connection);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn dropping_ignores_commands_the_server_never_read() {
    let mut connection = pipe_connect(&shell("echo OK; exec sleep 30")).expect("connect");
    let filler = "X".repeat(900);
    for _ in 0..32 {
        connection
            .session_mut()
            .write_line(&filler)
            .expect("fits in the pipe");
    }
    let started = Instant::now();
    drop(connection);
    assert!(started.elapsed() < Duration::from_secs(10));
}
