//! crates/logging/src/sanitize.rs
//! Rendering of protocol bytes for diagnostics.
//!
//! Protocol lines may carry binary payloads or secrets. These helpers make
//! them safe to print: control characters are escaped, binary buffers are
//! shown as truncated hex dumps, and confidential lines are replaced by a
//! placeholder.

use std::sync::{OnceLock, RwLock};

/// Environment variable that disables hex-dump truncation when set.
pub const FULL_LOGGING_ENV: &str = "ASSUAN_FULL_LOGGING";

/// Text logged in place of lines sent or received while a command is marked
/// confidential.
pub const CONFIDENTIAL_PLACEHOLDER: &str = "[Confidential data not shown]";

/// Buffers longer than this are truncated unless full logging is enabled.
const DUMP_LIMIT: usize = 16;

/// Number of bytes kept from a truncated buffer.
const DUMP_KEEP: usize = 12;

/// Longest log prefix retained by [`set_log_prefix`].
const MAX_PREFIX_LEN: usize = 79;

static FULL_LOGGING: OnceLock<bool> = OnceLock::new();
static LOG_PREFIX: RwLock<String> = RwLock::new(String::new());

/// Returns whether [`FULL_LOGGING_ENV`] was set when first queried.
pub fn full_logging() -> bool {
    *FULL_LOGGING.get_or_init(|| std::env::var_os(FULL_LOGGING_ENV).is_some())
}

/// Sets the prefix prepended to protocol log lines, or clears it with `None`.
///
/// Prefixes longer than 79 bytes are cut at the nearest character boundary.
pub fn set_log_prefix(prefix: Option<&str>) {
    let mut text = prefix.unwrap_or_default().to_owned();
    if text.len() > MAX_PREFIX_LEN {
        let mut end = MAX_PREFIX_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    *LOG_PREFIX.write().expect("log prefix lock poisoned") = text;
}

/// Returns the current log prefix (empty when unset).
pub fn log_prefix() -> String {
    LOG_PREFIX.read().expect("log prefix lock poisoned").clone()
}

/// Returns `"<prefix>[<pid>]: "` when a prefix is configured, otherwise an
/// empty string.
pub fn log_tag() -> String {
    let prefix = log_prefix();
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}[{}]: ", std::process::id())
    }
}

fn is_loggable(byte: u8) -> bool {
    byte >= 0x80 || byte.is_ascii_graphic() || byte == b' '
}

/// Escapes control characters in `bytes`.
///
/// `\r \n \f \v \b` use their C escapes; other non-printable ASCII bytes are
/// written as `\xNN`. Bytes at or above 0x80 pass through and are decoded
/// lossily.
pub fn sanitize(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            0x0c => out.extend_from_slice(b"\\f"),
            0x0b => out.extend_from_slice(b"\\v"),
            0x08 => out.extend_from_slice(b"\\b"),
            b if is_loggable(b) => out.push(b),
            b => out.extend_from_slice(format!("\\x{b:02x}").as_bytes()),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Renders a buffer for a debug dump.
///
/// Printable text that does not start with `[` is returned as is. Anything
/// else becomes a bracketed hex dump; when `full` is false, buffers longer
/// than 16 bytes show only their first 12 bytes followed by a skip count.
pub fn render_buffer(bytes: &[u8], full: bool) -> String {
    let printable = bytes.iter().all(|&b| is_loggable(b));
    if printable && bytes.first() != Some(&b'[') {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let mut out = String::from("[");
    if bytes.len() > DUMP_LIMIT && !full {
        for byte in &bytes[..DUMP_KEEP] {
            out.push_str(&format!(" {byte:02x}"));
        }
        out.push_str(&format!(" ...({} bytes skipped)", bytes.len() - DUMP_KEEP));
    } else {
        for byte in bytes {
            out.push_str(&format!(" {byte:02x}"));
        }
    }
    out.push_str(" ]");
    out
}

/// Renders a protocol line for logging, honouring the confidential flag and
/// the global full-logging switch.
pub fn render_line(line: &[u8], confidential: bool) -> String {
    if confidential {
        CONFIDENTIAL_PLACEHOLDER.to_owned()
    } else {
        render_buffer(line, full_logging())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_escapes_c_controls() {
        assert_eq!(sanitize(b"a\r\nb"), "a\\r\\nb");
        assert_eq!(sanitize(b"\x0c\x0b\x08"), "\\f\\v\\b");
    }

    #[test]
    fn sanitize_hex_escapes_other_controls() {
        assert_eq!(sanitize(b"\x00x\x1b"), "\\x00x\\x1b");
    }

    #[test]
    fn sanitize_keeps_printable_text() {
        assert_eq!(sanitize(b"OK Pleased to meet you"), "OK Pleased to meet you");
    }

    #[test]
    fn render_buffer_shows_plain_text_verbatim() {
        assert_eq!(render_buffer(b"D hello", false), "D hello");
    }

    #[test]
    fn render_buffer_dumps_bracket_prefixed_text_as_hex() {
        assert_eq!(render_buffer(b"[a", false), "[ 5b 61 ]");
    }

    #[test]
    fn render_buffer_truncates_long_binary_buffers() {
        let data: Vec<u8> = (0u8..20).collect();
        let rendered = render_buffer(&data, false);

        assert!(rendered.starts_with("[ 00 01 02"));
        assert!(rendered.ends_with(" 0b ...(8 bytes skipped) ]"));
    }

    #[test]
    fn render_buffer_full_mode_keeps_everything() {
        let data: Vec<u8> = (0u8..20).collect();
        let rendered = render_buffer(&data, true);

        assert!(rendered.contains(" 13 ]"));
        assert!(!rendered.contains("skipped"));
    }

    #[test]
    fn render_line_hides_confidential_content() {
        assert_eq!(render_line(b"D secret", true), CONFIDENTIAL_PLACEHOLDER);
    }

    #[test]
    fn log_prefix_is_truncated_and_cleared() {
        let long = "p".repeat(100);
        set_log_prefix(Some(&long));
        assert_eq!(log_prefix().len(), 79);
        assert!(log_tag().starts_with("ppp"));

        set_log_prefix(None);
        assert!(log_prefix().is_empty());
        assert!(log_tag().is_empty());
    }
}
