use super::*;

fn option_error(line: &str) -> String {
    let err = parse_option(line).expect_err("rejected option");
    assert_eq!(err.code(), ErrorCode::SyntaxError);
    err.text().unwrap_or_default().to_owned()
}

fn fd_error(line: &str) -> String {
    let err = parse_fd(line).expect_err("rejected fd argument");
    assert_eq!(err.code(), ErrorCode::SyntaxError);
    err.text().unwrap_or_default().to_owned()
}

#[test]
fn option_accepts_every_separator_form() {
    assert_eq!(parse_option("foo").unwrap(), ("foo", ""));
    assert_eq!(parse_option("foo bar").unwrap(), ("foo", "bar"));
    assert_eq!(parse_option("foo=bar").unwrap(), ("foo", "bar"));
    assert_eq!(parse_option("  foo = bar  ").unwrap(), ("foo", "bar"));
    assert_eq!(parse_option("foo bar baz").unwrap(), ("foo", "bar baz"));
    assert_eq!(parse_option("--display=:0").unwrap(), ("display", ":0"));
}

#[test]
fn option_rejects_malformed_lines() {
    assert_eq!(option_error(""), "argument required");
    assert_eq!(option_error("   "), "argument required");
    assert_eq!(option_error("=value"), "no option name given");
    assert_eq!(option_error("foo="), "option argument expected");
    assert_eq!(option_error("foo =  "), "option argument expected");
    assert_eq!(option_error("-v"), "option should not begin with one dash");
    assert_eq!(option_error("--"), "option should not begin with one dash");
}

#[test]
fn fd_argument_parses_numbers() {
    assert_eq!(parse_fd("FD=5").unwrap(), Some(5));
    assert_eq!(parse_fd("fd=12 trailing words").unwrap(), Some(12));
    assert_eq!(parse_fd("FD").unwrap(), None);
    assert_eq!(parse_fd("FD  ").unwrap(), None);
}

#[test]
fn fd_argument_rejects_garbage() {
    assert_eq!(fd_error("FD="), "number required");
    assert_eq!(fd_error("FD=x"), "number required");
    assert_eq!(fd_error("FD=5x"), "number required");
    assert_eq!(fd_error("FDX"), "FD[=<n>] expected");
    assert_eq!(fd_error("file.txt"), "FD[=<n>] expected");

    let err = parse_fd("FD=99999999999999999999").expect_err("overflow");
    assert_eq!(err.code(), ErrorCode::ParameterError);
}

#[test]
fn builtin_lookup_ignores_case() {
    for name in BUILTIN_COMMANDS {
        assert!(builtin_handler(name).is_some(), "{name}");
        assert!(builtin_handler(&name.to_ascii_lowercase()).is_some(), "{name}");
    }
    assert!(builtin_handler("GETINFO").is_none());
}

#[test]
fn registered_table_holds_builtins_in_order() {
    let mut table = CommandTable::new();
    register_all(&mut table);
    assert_eq!(table.names().collect::<Vec<_>>(), BUILTIN_COMMANDS);
}
