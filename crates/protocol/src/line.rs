//! Assembly of protocol lines from an arbitrary byte stream.

use memchr::memchr;
use thiserror::Error;

use crate::error::{AssuanError, ErrorCode};

/// Longest line content accepted, excluding the CR/LF terminator.
pub const MAX_LINE_LENGTH: usize = 1000;

/// Size of a full line buffer: content plus an optional CR and the LF.
pub const LINE_BUFFER_SIZE: usize = MAX_LINE_LENGTH + 2;

/// Failure to extract a line from the byte stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum FramingError {
    /// The line exceeded [`MAX_LINE_LENGTH`]; its bytes were discarded.
    #[error("line exceeds {MAX_LINE_LENGTH} bytes")]
    LineTooLong,
    /// The stream ended before the line's newline arrived.
    #[error("stream ended after {length} bytes of an unterminated line")]
    NotTerminated {
        /// Bytes buffered when the stream ended.
        length: usize,
    },
}

impl From<FramingError> for AssuanError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::LineTooLong => Self::new(ErrorCode::LineTooLong),
            FramingError::NotTerminated { .. } => Self::new(ErrorCode::LineNotTerminated),
        }
    }
}

/// Accumulates raw bytes and yields complete lines.
///
/// Lines end at `\n`; a single `\r` before it is stripped. A line whose
/// content grows past [`MAX_LINE_LENGTH`] is reported once as
/// [`FramingError::LineTooLong`] and everything up to its newline is dropped,
/// so the following line parses normally.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(LINE_BUFFER_SIZE),
            discarding: false,
        }
    }

    /// Appends bytes read from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Returns the number of buffered bytes not yet returned as a line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when [`next_line`](Self::next_line) would yield
    /// something without more input.
    #[must_use]
    pub fn has_complete_line(&self) -> bool {
        if self.discarding {
            // A newline ends the dropped line; anything after it may be a line.
            return match memchr(b'\n', &self.pending) {
                Some(pos) => memchr(b'\n', &self.pending[pos + 1..]).is_some()
                    || self.pending.len() - pos - 1 > MAX_LINE_LENGTH + 1,
                None => false,
            };
        }
        memchr(b'\n', &self.pending).is_some() || self.pending.len() > MAX_LINE_LENGTH + 1
    }

    /// Extracts the next complete line.
    ///
    /// Returns `None` when more input is required.
    pub fn next_line(&mut self) -> Option<Result<Vec<u8>, FramingError>> {
        if self.discarding {
            match memchr(b'\n', &self.pending) {
                Some(pos) => {
                    self.pending.drain(..=pos);
                    self.discarding = false;
                }
                None => {
                    self.pending.clear();
                    return None;
                }
            }
        }

        match memchr(b'\n', &self.pending) {
            Some(pos) => {
                let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.len() > MAX_LINE_LENGTH {
                    return Some(Err(FramingError::LineTooLong));
                }
                Some(Ok(line))
            }
            // Room is left for a trailing CR before the limit is certain.
            None if self.pending.len() > MAX_LINE_LENGTH + 1 => {
                self.pending.clear();
                self.discarding = true;
                Some(Err(FramingError::LineTooLong))
            }
            None => None,
        }
    }

    /// Reports what remains once the stream has ended.
    ///
    /// Returns `Ok(())` when no partial line is buffered.
    pub fn finish(&mut self) -> Result<(), FramingError> {
        let length = self.pending.len();
        self.pending.clear();
        let discarding = std::mem::take(&mut self.discarding);
        if length == 0 || discarding {
            Ok(())
        } else {
            Err(FramingError::NotTerminated { length })
        }
    }
}
