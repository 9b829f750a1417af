//! Commands every server understands.

use std::sync::Arc;

use logging::trace_cmd;
use protocol::{AssuanError, ErrorCode};

use crate::commands::{CommandHandler, CommandTable};
use crate::session::Session;

/// Names of the built-in commands, in registration order.
pub const BUILTIN_COMMANDS: [&str; 10] = [
    "NOP", "CANCEL", "OPTION", "BYE", "AUTH", "RESET", "END", "HELP", "INPUT", "OUTPUT",
];

pub(crate) fn register_all(table: &mut CommandTable) {
    for name in BUILTIN_COMMANDS {
        if let Some(handler) = builtin_handler(name) {
            table.insert(name, handler);
        }
    }
}

/// Returns the built-in handler registered under `name`, if there is one.
pub fn builtin_handler(name: &str) -> Option<Arc<dyn CommandHandler>> {
    let handler: fn(&mut Session, &str) -> Result<(), AssuanError> =
        match name.to_ascii_uppercase().as_str() {
            "NOP" => nop,
            "CANCEL" => cancel,
            "OPTION" => option,
            "BYE" => bye,
            "AUTH" | "END" => not_implemented,
            "RESET" => reset,
            "HELP" => help,
            "INPUT" => input,
            "OUTPUT" => output,
            _ => return None,
        };
    Some(Arc::new(handler))
}

fn syntax_error(text: &str) -> AssuanError {
    AssuanError::with_text(ErrorCode::SyntaxError, text)
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn nop(_: &mut Session, _: &str) -> Result<(), AssuanError> {
    Ok(())
}

fn not_implemented(_: &mut Session, _: &str) -> Result<(), AssuanError> {
    Err(AssuanError::new(ErrorCode::NotImplemented))
}

fn cancel(session: &mut Session, _: &str) -> Result<(), AssuanError> {
    let hook = session.hooks.cancel.clone();
    session.run_notify(hook);
    Err(AssuanError::new(ErrorCode::NotImplemented))
}

fn bye(session: &mut Session, _: &str) -> Result<(), AssuanError> {
    let hook = session.hooks.bye.clone();
    session.run_notify(hook);
    let _ = session.close_input();
    let _ = session.close_output();
    Err(AssuanError::eof())
}

fn reset(session: &mut Session, _: &str) -> Result<(), AssuanError> {
    let hook = session.hooks.reset.clone();
    session.run_notify(hook);
    if let Err(err) = session.close_input() {
        trace_cmd!(error = %err, "closing input descriptor on reset");
    }
    if let Err(err) = session.close_output() {
        trace_cmd!(error = %err, "closing output descriptor on reset");
    }
    Ok(())
}

fn help(session: &mut Session, _: &str) -> Result<(), AssuanError> {
    let names: Vec<String> = session.command_names().map(str::to_owned).collect();
    for name in names {
        session.write_line(&format!("# {name}"))?;
    }
    Ok(())
}

/// Splits an `OPTION` argument into key and value.
///
/// Accepts `key`, `key value`, `key=value` and `key = value`; a leading
/// `--` on the key is dropped. The value is empty when none was given.
pub fn parse_option(line: &str) -> Result<(&str, &str), AssuanError> {
    let line = line.trim_start_matches(is_blank);
    if line.is_empty() {
        return Err(syntax_error("argument required"));
    }
    if line.starts_with('=') {
        return Err(syntax_error("no option name given"));
    }

    let key_end = line.find(|c: char| is_blank(c) || c == '=').unwrap_or(line.len());
    let mut key = &line[..key_end];
    let mut value = line[key_end..].trim_start_matches(is_blank);
    if let Some(rest) = value.strip_prefix('=') {
        value = rest.trim_start_matches(is_blank);
        if value.is_empty() {
            return Err(syntax_error("option argument expected"));
        }
    }
    let value = value.trim_end_matches(is_blank);

    if let Some(stripped) = key.strip_prefix("--") {
        if !stripped.is_empty() {
            key = stripped;
        }
    }
    if key.starts_with('-') {
        return Err(syntax_error("option should not begin with one dash"));
    }
    Ok((key, value))
}

fn option(session: &mut Session, args: &str) -> Result<(), AssuanError> {
    let (key, value) = parse_option(args)?;
    trace_cmd!(key, "option");
    match session.hooks.option.clone() {
        Some(hook) => hook(session, key, value),
        None => Ok(()),
    }
}

/// Parses the `FD=<n>` argument of `INPUT` and `OUTPUT`.
///
/// Returns `None` for a bare `FD`, which asks for descriptor passing.
pub fn parse_fd(line: &str) -> Result<Option<i64>, AssuanError> {
    let rest = line
        .strip_prefix("FD")
        .or_else(|| line.strip_prefix("fd"))
        .ok_or_else(|| syntax_error("FD[=<n>] expected"))?;

    if let Some(number) = rest.strip_prefix('=') {
        let digits_end = number
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(number.len());
        if digits_end == 0 {
            return Err(syntax_error("number required"));
        }
        let trailing = &number[digits_end..];
        if !trailing.is_empty() && !trailing.starts_with(is_blank) {
            return Err(syntax_error("number required"));
        }
        return number[..digits_end]
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AssuanError::with_text(ErrorCode::ParameterError, "fd out of range"));
    }
    if rest.is_empty() || rest.starts_with(is_blank) {
        return Ok(None);
    }
    Err(syntax_error("FD[=<n>] expected"))
}

fn bind_fd(session: &Session, args: &str) -> Result<i64, AssuanError> {
    let Some(fd) = parse_fd(args)? else {
        return Err(AssuanError::with_text(
            ErrorCode::NotImplemented,
            "descriptor passing is not available on pipes",
        ));
    };
    if session.inbound_descriptor() == Some(fd) {
        return Err(AssuanError::with_text(
            ErrorCode::ParameterConflict,
            "fd same as inbound fd",
        ));
    }
    if session.outbound_descriptor() == Some(fd) {
        return Err(AssuanError::with_text(
            ErrorCode::ParameterConflict,
            "fd same as outbound fd",
        ));
    }
    Ok(fd)
}

fn input(session: &mut Session, args: &str) -> Result<(), AssuanError> {
    let fd = bind_fd(session, args)?;
    session.set_input_fd(fd);
    if let Some(hook) = session.hooks.input.clone() {
        hook(session, args);
    }
    Ok(())
}

fn output(session: &mut Session, args: &str) -> Result<(), AssuanError> {
    let fd = bind_fd(session, args)?;
    session.set_output_fd(fd);
    if let Some(hook) = session.hooks.output.clone() {
        hook(session, args);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
