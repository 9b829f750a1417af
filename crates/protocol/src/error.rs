use std::fmt;
use std::io;

macro_rules! error_codes {
    ($($(#[$meta:meta])* $variant:ident = $code:literal => $text:literal,)+) => {
        /// Numeric code carried by an Assuan `ERR` line.
        ///
        /// Codes below 100 describe local failures of the library itself; codes
        /// from 100 upwards are status codes meant for the peer. Values in
        /// `1000..=9999` are reserved for applications.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum ErrorCode {
            $($(#[$meta])* $variant,)+
            /// Application-defined code in `1000..=9999`.
            User(u32),
            /// A code this library does not know about.
            Other(u32),
            /// The connection was closed; never sent as an `ERR` line.
            Eof,
        }

        impl ErrorCode {
            /// Returns the numeric wire value.
            #[must_use]
            pub const fn code(self) -> u32 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::User(code) | Self::Other(code) => code,
                    Self::Eof => EOF_CODE,
                }
            }

            /// Maps a numeric wire value back to a code.
            #[must_use]
            pub const fn from_code(code: u32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    EOF_CODE => Self::Eof,
                    USER_CODE_MIN..=USER_CODE_MAX => Self::User(code),
                    _ => Self::Other(code),
                }
            }

            /// Returns the fixed English description of the code.
            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::User(_) => "User defined error",
                    Self::Other(_) => "Unknown error code",
                    Self::Eof => "EOF",
                }
            }
        }
    };
}

/// Wire value used internally for a closed connection.
pub const EOF_CODE: u32 = 16383;

/// Smallest application-defined code.
pub const USER_CODE_MIN: u32 = 1000;

/// Largest application-defined code.
pub const USER_CODE_MAX: u32 = 9999;

/// Codes below this value are reported to the peer as a server fault.
const STATUS_CODE_BASE: u32 = 100;

/// Upper bound on the description embedded in an `ERR` line.
const MAX_DESCRIPTION: usize = 50;

/// Upper bound on the attached text embedded in an `ERR` line.
const MAX_TEXT: usize = 100;

error_codes! {
    /// Unspecified failure.
    General = 1 => "General error",
    /// Memory allocation failed.
    OutOfCore = 2 => "Out of core",
    /// An argument was invalid.
    InvalidValue = 3 => "Invalid value",
    /// A bounded wait expired.
    Timeout = 4 => "Timeout",
    /// Reading from the transport failed.
    ReadError = 5 => "Read error",
    /// Writing to the transport failed.
    WriteError = 6 => "Write error",
    /// The server process could not be started.
    ProblemStartingServer = 7 => "Problem starting server",
    /// A server-only operation was used on a client session.
    NotAServer = 8 => "Not a server",
    /// A client-only operation was used on a server session.
    NotAClient = 9 => "Not a client",
    /// A command arrived while another one was still active.
    NestedCommands = 10 => "Nested commands",
    /// The peer sent a malformed response line.
    InvalidResponse = 11 => "Invalid response",
    /// Data lines arrived without a data callback.
    NoDataCallback = 12 => "No data callback",
    /// An inquiry arrived without an inquire callback.
    NoInquireCallback = 13 => "No inquire callback",
    /// Connecting to the server failed.
    ConnectFailed = 14 => "Connect failed",
    /// Accepting a connection failed.
    AcceptFailed = 15 => "Accept failed",
    /// The command is known but not implemented.
    NotImplemented = 100 => "Not implemented",
    /// Internal server failure.
    ServerFault = 101 => "Server fault",
    /// The command is invalid in this context.
    InvalidCommand = 102 => "Invalid command",
    /// No handler is registered for the command.
    UnknownCommand = 103 => "Unknown command",
    /// The command line could not be parsed.
    SyntaxError = 104 => "Syntax error",
    /// A parameter was rejected.
    ParameterError = 105 => "Parameter error",
    /// Two parameters conflict.
    ParameterConflict = 106 => "Parameter conflict",
    /// A line exceeded the protocol maximum.
    LineTooLong = 107 => "Line too long",
    /// The stream ended inside a line.
    LineNotTerminated = 108 => "Line not terminated",
    /// No input descriptor has been set.
    NoInput = 109 => "No input source",
    /// No output descriptor has been set.
    NoOutput = 110 => "No output source",
    /// The operation was canceled.
    Canceled = 111 => "Operation cancelled",
    /// The algorithm is not supported.
    UnsupportedAlgorithm = 112 => "Unsupported algorithm",
    /// The server ran out of a resource.
    ServerResourceProblem = 113 => "Server resource problem",
    /// The server hit an I/O failure.
    ServerIoError = 114 => "Server IO error",
    /// The server detected an internal bug.
    ServerBug = 115 => "Server bug",
    /// No data is available.
    NoDataAvailable = 116 => "No data available",
    /// The data is invalid.
    InvalidData = 117 => "Invalid data",
    /// The command was not expected now.
    UnexpectedCommand = 118 => "Unexpected command",
    /// More data arrived than allowed.
    TooMuchData = 119 => "Too much data",
    /// The inquiry keyword is unknown.
    InquireUnknown = 120 => "Inquire unknown",
    /// The inquiry failed.
    InquireError = 121 => "Inquire error",
    /// The option is invalid.
    InvalidOption = 122 => "Invalid option",
    /// The index is invalid.
    InvalidIndex = 123 => "Invalid index",
    /// A status line was not expected.
    UnexpectedStatus = 124 => "Unexpected status",
    /// A data line was not expected.
    UnexpectedData = 125 => "Unexpected data",
    /// A status line was malformed.
    InvalidStatus = 126 => "Invalid status",
    /// The locale could not be set up.
    LocaleProblem = 127 => "Locale problem",
    /// The user did not confirm.
    NotConfirmed = 128 => "Not confirmed",
    /// Certificate is bad.
    BadCertificate = 201 => "Bad certificate",
    /// Certificate chain is bad.
    BadCertificateChain = 202 => "Bad certificate chain",
    /// Certificate is missing.
    MissingCertificate = 203 => "Missing certificate",
    /// Signature is bad.
    BadSignature = 204 => "Bad signature",
    /// No agent is running.
    NoAgent = 205 => "No agent running",
    /// The agent reported an error.
    AgentError = 206 => "Agent error",
    /// No public key is available.
    NoPublicKey = 207 => "No public key",
    /// No secret key is available.
    NoSecretKey = 208 => "No secret key",
    /// The name is invalid.
    InvalidName = 209 => "Invalid name",
    /// Certificate has been revoked.
    CertRevoked = 301 => "Certificate revoked",
    /// No CRL is known for the certificate.
    NoCrlForCert = 302 => "No CRL for certificate",
    /// The CRL is too old.
    CrlTooOld = 303 => "CRL too old",
    /// The certificate is not trusted.
    NotTrusted = 304 => "Not trusted",
    /// Generic smartcard error.
    CardError = 401 => "Card error",
    /// The card is invalid.
    InvalidCard = 402 => "Invalid card",
    /// The card lacks a PKCS#15 application.
    NoPkcs15App = 403 => "No PKCS15 application",
    /// No card is present.
    CardNotPresent = 404 => "Card not present",
    /// The identifier is invalid.
    InvalidId = 405 => "Invalid ID",
}

impl ErrorCode {
    /// Returns `true` for the connection-closed marker.
    #[must_use]
    pub const fn is_eof(self) -> bool {
        matches!(self, Self::Eof)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// An error code with an optional human-readable explanation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssuanError {
    code: ErrorCode,
    text: Option<String>,
}

impl AssuanError {
    /// Creates an error without attached text.
    #[must_use]
    pub const fn new(code: ErrorCode) -> Self {
        Self { code, text: None }
    }

    /// Creates an error carrying `text` after the description.
    #[must_use]
    pub fn with_text(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: Some(text.into()),
        }
    }

    /// The connection-closed marker returned by `BYE`.
    #[must_use]
    pub const fn eof() -> Self {
        Self::new(ErrorCode::Eof)
    }

    /// Wraps a failed read from the transport.
    #[must_use]
    pub fn read(err: &io::Error) -> Self {
        Self::with_text(ErrorCode::ReadError, err.to_string())
    }

    /// Wraps a failed write to the transport.
    #[must_use]
    pub fn write(err: &io::Error) -> Self {
        Self::with_text(ErrorCode::WriteError, err.to_string())
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the attached text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns `true` when this error signals a closed connection.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.code.is_eof()
    }

    /// Formats the `ERR` line sent to the peer.
    ///
    /// Library-internal codes (below 100) are reported as
    /// `ERR 101 server fault (<description>)`. Everything else renders as
    /// `ERR <code> <description>[ - <text>]`, with the description and text
    /// cut to 50 and 100 bytes respectively.
    #[must_use]
    pub fn render_err_line(&self) -> String {
        let code = self.code.code();
        if code < STATUS_CODE_BASE {
            return format!(
                "ERR {} server fault ({})",
                ErrorCode::ServerFault.code(),
                truncate(self.code.description(), MAX_DESCRIPTION)
            );
        }

        let mut line = format!(
            "ERR {code} {}",
            truncate(self.code.description(), MAX_DESCRIPTION)
        );
        if let Some(text) = &self.text {
            line.push_str(" - ");
            line.push_str(truncate(text, MAX_TEXT));
        }
        line
    }

    /// Parses the payload of an `ERR` line received from a server.
    ///
    /// `rest` is everything after `ERR `. The remaining text after the code
    /// is kept verbatim; an unparsable code maps to
    /// [`ErrorCode::InvalidResponse`].
    #[must_use]
    pub fn from_err_payload(rest: &str) -> Self {
        let rest = rest.trim_start();
        let (number, text) = rest.split_once(' ').unwrap_or((rest, ""));
        match number.parse::<u32>() {
            Ok(code) if text.is_empty() => Self::new(ErrorCode::from_code(code)),
            Ok(code) => Self::with_text(ErrorCode::from_code(code), text.trim()),
            Err(_) => Self::with_text(ErrorCode::InvalidResponse, rest),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl From<ErrorCode> for AssuanError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for AssuanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} ({}): {text}", self.code, self.code.code()),
            None => write!(f, "{} ({})", self.code, self.code.code()),
        }
    }
}

impl std::error::Error for AssuanError {}

impl From<io::Error> for AssuanError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::eof(),
            io::ErrorKind::TimedOut => Self::with_text(ErrorCode::Timeout, err.to_string()),
            _ => Self::with_text(ErrorCode::General, err.to_string()),
        }
    }
}

impl From<AssuanError> for io::Error {
    fn from(err: AssuanError) -> Self {
        let kind = match err.code() {
            ErrorCode::Eof => io::ErrorKind::UnexpectedEof,
            ErrorCode::Timeout => io::ErrorKind::TimedOut,
            ErrorCode::ReadError | ErrorCode::WriteError => io::ErrorKind::BrokenPipe,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_numbers() {
        for code in [1, 10, 15, 100, 103, 107, 128, 201, 405] {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
        assert_eq!(ErrorCode::from_code(103), ErrorCode::UnknownCommand);
    }

    #[test]
    fn user_and_unknown_codes_are_preserved() {
        assert_eq!(ErrorCode::from_code(1234), ErrorCode::User(1234));
        assert_eq!(ErrorCode::from_code(555), ErrorCode::Other(555));
        assert_eq!(ErrorCode::from_code(EOF_CODE), ErrorCode::Eof);
    }

    #[test]
    fn low_codes_render_as_server_fault() {
        let err = AssuanError::with_text(ErrorCode::General, "ignored");
        assert_eq!(err.render_err_line(), "ERR 101 server fault (General error)");
    }

    #[test]
    fn status_codes_render_with_description() {
        let err = AssuanError::new(ErrorCode::UnknownCommand);
        assert_eq!(err.render_err_line(), "ERR 103 Unknown command");
    }

    #[test]
    fn attached_text_follows_a_dash() {
        let err = AssuanError::with_text(ErrorCode::SyntaxError, "argument required");
        assert_eq!(
            err.render_err_line(),
            "ERR 104 Syntax error - argument required"
        );
    }

    #[test]
    fn attached_text_is_truncated() {
        let err = AssuanError::with_text(ErrorCode::User(1000), "x".repeat(300));
        let line = err.render_err_line();
        assert_eq!(line.len(), "ERR 1000 User defined error - ".len() + 100);
    }

    #[test]
    fn err_payload_parses_code_and_text() {
        let err = AssuanError::from_err_payload("1 simulated failure");
        assert_eq!(err.code(), ErrorCode::General);
        assert_eq!(err.text(), Some("simulated failure"));

        let bare = AssuanError::from_err_payload("103");
        assert_eq!(bare.code(), ErrorCode::UnknownCommand);
        assert_eq!(bare.text(), None);
    }

    #[test]
    fn err_payload_without_number_is_invalid_response() {
        let err = AssuanError::from_err_payload("oops");
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }

    #[test]
    fn io_conversions_preserve_eof() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "gone");
        assert!(AssuanError::from(eof).is_eof());

        let back: io::Error = AssuanError::eof().into();
        assert_eq!(back.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn display_includes_numeric_code() {
        let err = AssuanError::with_text(ErrorCode::ParameterConflict, "fd same as inbound fd");
        assert_eq!(
            err.to_string(),
            "Parameter conflict (106): fd same as inbound fd"
        );
    }
}
