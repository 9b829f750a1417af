use crate::error::{AssuanError, ErrorCode};
use crate::escape::{escape_data, unescape};

/// One line of the Assuan conversation other than a command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// `OK[ <text>]`: the command succeeded.
    Ok(Option<String>),
    /// `ERR <code>[ <description>]`: the command failed.
    Err(AssuanError),
    /// `S <KEYWORD>[ <text>]`: status or progress information.
    Status {
        /// Status keyword.
        keyword: String,
        /// Free text following the keyword.
        text: String,
    },
    /// `D <escaped>`: one chunk of payload, already unescaped.
    Data(Vec<u8>),
    /// `#<text>`: ignorable comment.
    Comment(String),
    /// `INQUIRE <KEYWORD>[ <params>]`: the server asks for data.
    Inquire {
        /// Inquiry keyword.
        keyword: String,
        /// Parameters following the keyword.
        params: String,
    },
    /// `END`: terminates the data sent for an inquiry.
    End,
    /// `CAN`: the client cancels an inquiry.
    Cancel,
}

fn split_keyword(rest: &str) -> (String, String) {
    let rest = rest.trim_start_matches(' ');
    match rest.split_once(' ') {
        Some((keyword, text)) => (keyword.to_owned(), text.trim_start_matches(' ').to_owned()),
        None => (rest.to_owned(), String::new()),
    }
}

impl Response {
    /// Parses a line without its terminator.
    ///
    /// Lines matching none of the known shapes yield
    /// [`ErrorCode::InvalidResponse`].
    pub fn parse(line: &[u8]) -> Result<Self, AssuanError> {
        if let Some(payload) = line.strip_prefix(b"D ") {
            return Ok(Self::Data(unescape(payload)));
        }
        if line == b"D" {
            return Ok(Self::Data(Vec::new()));
        }

        let text = std::str::from_utf8(line)
            .map_err(|_| AssuanError::with_text(ErrorCode::InvalidResponse, "line is not UTF-8"))?;

        if let Some(comment) = text.strip_prefix('#') {
            return Ok(Self::Comment(comment.trim_start_matches(' ').to_owned()));
        }
        if text == "OK" {
            return Ok(Self::Ok(None));
        }
        if let Some(rest) = text.strip_prefix("OK ") {
            let rest = rest.trim_start_matches(' ');
            return Ok(Self::Ok((!rest.is_empty()).then(|| rest.to_owned())));
        }
        if let Some(rest) = text.strip_prefix("ERR ") {
            return Ok(Self::Err(AssuanError::from_err_payload(rest)));
        }
        if let Some(rest) = text.strip_prefix("S ") {
            let (keyword, text) = split_keyword(rest);
            return Ok(Self::Status { keyword, text });
        }
        if let Some(rest) = text.strip_prefix("INQUIRE ") {
            let (keyword, params) = split_keyword(rest);
            return Ok(Self::Inquire { keyword, params });
        }
        match text {
            "END" => Ok(Self::End),
            "CAN" | "CANCEL" => Ok(Self::Cancel),
            _ => Err(AssuanError::with_text(
                ErrorCode::InvalidResponse,
                text.chars().take(40).collect::<String>(),
            )),
        }
    }

    /// Renders the line without its terminator.
    ///
    /// Data payloads are escaped but not split; callers sending large
    /// payloads chunk them first.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        match self {
            Self::Ok(None) => b"OK".to_vec(),
            Self::Ok(Some(text)) => format!("OK {text}").into_bytes(),
            Self::Err(err) => err.render_err_line().into_bytes(),
            Self::Status { keyword, text } if text.is_empty() => format!("S {keyword}").into_bytes(),
            Self::Status { keyword, text } => format!("S {keyword} {text}").into_bytes(),
            Self::Data(payload) => {
                let mut line = b"D ".to_vec();
                line.extend_from_slice(&escape_data(payload));
                line
            }
            Self::Comment(text) => format!("# {text}").into_bytes(),
            Self::Inquire { keyword, params } if params.is_empty() => {
                format!("INQUIRE {keyword}").into_bytes()
            }
            Self::Inquire { keyword, params } => format!("INQUIRE {keyword} {params}").into_bytes(),
            Self::End => b"END".to_vec(),
            Self::Cancel => b"CAN".to_vec(),
        }
    }
}

/// Splits a command line into its name and argument string.
///
/// The name ends at the first space or tab; blanks after it are skipped and
/// the rest is returned verbatim. A line starting with a blank is a syntax
/// error.
pub fn split_command(line: &str) -> Result<(&str, &str), AssuanError> {
    let is_blank = |c: char| c == ' ' || c == '\t';
    if line.starts_with(is_blank) {
        return Err(AssuanError::with_text(
            ErrorCode::SyntaxError,
            "leading white-space",
        ));
    }
    match line.find(is_blank) {
        Some(end) => Ok((&line[..end], line[end..].trim_start_matches(is_blank))),
        None => Ok((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_lines_carry_optional_text() {
        assert_eq!(Response::parse(b"OK").unwrap(), Response::Ok(None));
        assert_eq!(
            Response::parse(b"OK Pleased to meet you").unwrap(),
            Response::Ok(Some("Pleased to meet you".to_owned()))
        );
    }

    #[test]
    fn err_lines_parse_code() {
        let Response::Err(err) = Response::parse(b"ERR 103 Unknown command").unwrap() else {
            panic!("expected ERR");
        };
        assert_eq!(err.code(), ErrorCode::UnknownCommand);
        assert_eq!(err.text(), Some("Unknown command"));
    }

    #[test]
    fn status_lines_split_keyword() {
        assert_eq!(
            Response::parse(b"S PROGRESS 10 100").unwrap(),
            Response::Status {
                keyword: "PROGRESS".to_owned(),
                text: "10 100".to_owned()
            }
        );
    }

    #[test]
    fn data_lines_are_unescaped() {
        assert_eq!(
            Response::parse(b"D a%0Ab+c").unwrap(),
            Response::Data(b"a\nb c".to_vec())
        );
    }

    #[test]
    fn inquire_and_terminators_parse() {
        assert_eq!(
            Response::parse(b"INQUIRE PASSPHRASE").unwrap(),
            Response::Inquire {
                keyword: "PASSPHRASE".to_owned(),
                params: String::new()
            }
        );
        assert_eq!(Response::parse(b"END").unwrap(), Response::End);
        assert_eq!(Response::parse(b"CAN").unwrap(), Response::Cancel);
        assert_eq!(Response::parse(b"CANCEL").unwrap(), Response::Cancel);
    }

    #[test]
    fn comments_are_recognised() {
        assert_eq!(
            Response::parse(b"# hello").unwrap(),
            Response::Comment("hello".to_owned())
        );
    }

    #[test]
    fn unknown_lines_are_invalid_responses() {
        let err = Response::parse(b"OKAY").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }

    #[test]
    fn render_produces_wire_shapes() {
        assert_eq!(Response::Ok(None).render(), b"OK");
        assert_eq!(
            Response::Status {
                keyword: "PROGRESS".to_owned(),
                text: String::new()
            }
            .render(),
            b"S PROGRESS"
        );
        assert_eq!(Response::Data(b"50%".to_vec()).render(), b"D 50%25");
        assert_eq!(Response::Cancel.render(), b"CAN");
        assert_eq!(
            Response::Err(AssuanError::new(ErrorCode::NotImplemented)).render(),
            b"ERR 100 Not implemented"
        );
    }

    #[test]
    fn split_command_separates_name_and_arguments() {
        assert_eq!(split_command("OPTION  a=b").unwrap(), ("OPTION", "a=b"));
        assert_eq!(split_command("NOP").unwrap(), ("NOP", ""));
        assert_eq!(split_command("INPUT\tFD=3").unwrap(), ("INPUT", "FD=3"));
    }

    #[test]
    fn split_command_rejects_leading_blanks() {
        let err = split_command(" NOP").unwrap_err();
        assert_eq!(err.code(), ErrorCode::SyntaxError);
        assert_eq!(err.text(), Some("leading white-space"));
    }
}
