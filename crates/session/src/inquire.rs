//! Server-side inquiries: asking the client for data mid-command.

use std::fmt;

use logging::{log_tag, trace_cmd};
use protocol::{AssuanError, ErrorCode, unescape};

use crate::session::Session;

/// Continuation run when an [`inquire_ext`](Session::inquire_ext) exchange
/// ends. Its result completes the suspended command.
pub type InquireContinuation =
    Box<dyn FnOnce(&mut Session, Result<Vec<u8>, AssuanError>) -> Result<(), AssuanError> + Send>;

pub(crate) struct PendingInquire {
    collected: Collected,
    max_len: Option<usize>,
    continuation: InquireContinuation,
}

impl fmt::Debug for PendingInquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInquire")
            .field("buffered", &self.collected.buffer.len())
            .field("max_len", &self.max_len)
            .field("failure", &self.collected.failure)
            .finish_non_exhaustive()
    }
}

/// What a client line means while an inquiry is open.
enum Answer {
    Data(Vec<u8>),
    End,
    Cancel,
    Ignore,
    Unexpected,
}

fn classify(line: &[u8]) -> Answer {
    if let Some(payload) = line.strip_prefix(b"D ") {
        return Answer::Data(unescape(payload));
    }
    match line {
        b"D" => Answer::Data(Vec::new()),
        b"END" => Answer::End,
        b"CAN" | b"CANCEL" => Answer::Cancel,
        [] | [b'#', ..] => Answer::Ignore,
        _ => Answer::Unexpected,
    }
}

fn append_bounded(
    buffer: &mut Vec<u8>,
    chunk: &[u8],
    max_len: Option<usize>,
) -> Result<(), AssuanError> {
    buffer.extend_from_slice(chunk);
    match max_len {
        Some(max) if buffer.len() > max => Err(AssuanError::new(ErrorCode::TooMuchData)),
        _ => Ok(()),
    }
}

/// Collected answer of one inquiry.
///
/// The first failure is kept and later data is dropped; the client's
/// remaining `D` lines are still consumed up to `END` so they never reach
/// the dispatcher.
#[derive(Debug, Default)]
struct Collected {
    buffer: Vec<u8>,
    failure: Option<AssuanError>,
}

impl Collected {
    fn push(&mut self, chunk: &[u8], max_len: Option<usize>) {
        if self.failure.is_some() {
            return;
        }
        if let Err(err) = append_bounded(&mut self.buffer, chunk, max_len) {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: AssuanError) {
        if self.failure.is_none() {
            trace_cmd!(error = %err, "inquiry failed, draining the answer");
            self.buffer.clear();
            self.failure = Some(err);
        }
    }

    fn finish(self) -> Result<Vec<u8>, AssuanError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.buffer),
        }
    }
}

impl Session {
    fn begin_inquire(&mut self, keyword: &str) -> Result<(), AssuanError> {
        self.require_server()?;
        if keyword.is_empty() || keyword.contains(' ') {
            return Err(AssuanError::with_text(
                ErrorCode::InvalidValue,
                "invalid inquire keyword",
            ));
        }
        if !self.in_command() {
            return Err(AssuanError::with_text(
                ErrorCode::General,
                "no command in progress",
            ));
        }
        if self.in_inquire {
            return Err(AssuanError::new(ErrorCode::NestedCommands));
        }
        trace_cmd!(keyword, "inquiring client");
        self.write_line(&format!("INQUIRE {keyword}"))?;
        self.in_inquire = true;
        Ok(())
    }

    /// Asks the client for data and waits for the answer.
    ///
    /// Collects the payload of `D` lines until `END`. Returns
    /// [`ErrorCode::Canceled`] when the client sends `CAN`. When more than
    /// `max_len` bytes arrive, or a line is too long, the rest of the answer
    /// is read and dropped and [`ErrorCode::TooMuchData`] or
    /// [`ErrorCode::LineTooLong`] is returned once the client ends it.
    pub fn inquire(&mut self, keyword: &str, max_len: Option<usize>) -> Result<Vec<u8>, AssuanError> {
        self.begin_inquire(keyword)?;
        let result = self.collect_inquire(max_len);
        self.in_inquire = false;
        result
    }

    fn collect_inquire(&mut self, max_len: Option<usize>) -> Result<Vec<u8>, AssuanError> {
        let mut collected = Collected::default();
        loop {
            let line = match self.read_line(true) {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(err) if err.code() == ErrorCode::LineTooLong => {
                    collected.fail(err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            match classify(&line) {
                Answer::Data(chunk) => collected.push(&chunk, max_len),
                Answer::End => return collected.finish(),
                Answer::Cancel => return Err(AssuanError::new(ErrorCode::Canceled)),
                Answer::Ignore => {}
                Answer::Unexpected => return Err(AssuanError::new(ErrorCode::UnexpectedCommand)),
            }
        }
    }

    /// Starts an inquiry without waiting for the answer.
    ///
    /// The running command is deferred; [`process_next`](Self::process_next)
    /// feeds the client's lines to the inquiry and, once it ends, passes the
    /// collected bytes or the error to `continuation`, whose result completes
    /// the command.
    pub fn inquire_ext(
        &mut self,
        keyword: &str,
        max_len: Option<usize>,
        continuation: impl FnOnce(&mut Self, Result<Vec<u8>, AssuanError>) -> Result<(), AssuanError>
        + Send
        + 'static,
    ) -> Result<(), AssuanError> {
        self.begin_inquire(keyword)?;
        self.defer_completion()?;
        self.pending_inquire = Some(PendingInquire {
            collected: Collected::default(),
            max_len,
            continuation: Box::new(continuation),
        });
        Ok(())
    }

    /// Feeds one client line to the open [`inquire_ext`](Self::inquire_ext)
    /// exchange.
    pub(crate) fn feed_inquire(&mut self, line: &[u8]) -> Result<(), AssuanError> {
        let Some(pending) = self.pending_inquire.as_mut() else {
            return Ok(());
        };
        let outcome = match classify(line) {
            Answer::Data(chunk) => {
                pending.collected.push(&chunk, pending.max_len);
                return Ok(());
            }
            Answer::End => std::mem::take(&mut pending.collected).finish(),
            Answer::Cancel => Err(AssuanError::new(ErrorCode::Canceled)),
            Answer::Ignore => return Ok(()),
            Answer::Unexpected => Err(AssuanError::new(ErrorCode::UnexpectedCommand)),
        };

        let Some(pending) = self.pending_inquire.take() else {
            return Ok(());
        };
        self.in_inquire = false;
        trace_cmd!(ok = outcome.is_ok(), "{}inquiry finished", log_tag());
        let result = (pending.continuation)(self, outcome);
        self.process_done(result)
    }

    /// Records a framing error against the open
    /// [`inquire_ext`](Self::inquire_ext) exchange; it is reported once the
    /// client ends the answer.
    pub(crate) fn fail_inquire(&mut self, err: AssuanError) {
        if let Some(pending) = self.pending_inquire.as_mut() {
            pending.collected.fail(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_lines_are_classified() {
        assert!(matches!(classify(b"D a+b%25"), Answer::Data(ref d) if d == b"a b%"));
        assert!(matches!(classify(b"D"), Answer::Data(ref d) if d.is_empty()));
        assert!(matches!(classify(b"END"), Answer::End));
        assert!(matches!(classify(b"CAN"), Answer::Cancel));
        assert!(matches!(classify(b"CANCEL"), Answer::Cancel));
        assert!(matches!(classify(b"# note"), Answer::Ignore));
        assert!(matches!(classify(b""), Answer::Ignore));
        assert!(matches!(classify(b"NOP"), Answer::Unexpected));
    }

    #[test]
    fn bounded_append_rejects_overflow() {
        let mut buffer = Vec::new();
        append_bounded(&mut buffer, b"abc", Some(4)).expect("fits");
        let err = append_bounded(&mut buffer, b"de", Some(4)).expect_err("too much");
        assert_eq!(err.code(), ErrorCode::TooMuchData);
        append_bounded(&mut buffer, &[0; 100], None).expect("unbounded");
    }

    #[test]
    fn first_failure_wins_and_later_data_is_dropped() {
        let mut collected = Collected::default();
        collected.push(b"abc", Some(4));
        collected.push(b"de", Some(4));
        collected.fail(AssuanError::new(ErrorCode::LineTooLong));
        collected.push(b"f", None);

        assert!(collected.buffer.is_empty());
        let err = collected.finish().expect_err("overflowed");
        assert_eq!(err.code(), ErrorCode::TooMuchData);
    }
}
