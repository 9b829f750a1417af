#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `protocol` holds the transport-independent pieces of the Assuan line
//! protocol: framing raw bytes into lines, percent-plus escaping, the response
//! line shapes exchanged between client and server, and the numeric error
//! codes carried by `ERR` lines.
//!
//! # Design
//!
//! - [`LineBuffer`] accepts bytes in arbitrary chunks and yields lines once
//!   their newline has arrived, enforcing [`MAX_LINE_LENGTH`].
//! - [`escape_data`] and [`unescape`] implement the `%XX`/`+` scheme used by
//!   `D` lines.
//! - [`Response`] parses and renders every non-command line.
//! - [`ErrorCode`] and [`AssuanError`] model failures and render them as
//!   `ERR` lines.
//!
//! # Invariants
//!
//! - A line longer than [`MAX_LINE_LENGTH`] is reported as
//!   [`FramingError::LineTooLong`] exactly once and never corrupts the lines
//!   that follow it.
//! - Escaped output never contains CR or LF.
//! - [`ErrorCode::Eof`] never appears on the wire as an `ERR` line.
//!
//! # Errors
//!
//! Parsing failures are reported as [`AssuanError`] values with a code from
//! the protocol's numeric table; framing failures use [`FramingError`], which
//! converts into the matching [`AssuanError`].
//!
//! # Examples
//!
//! ```
//! use protocol::{LineBuffer, Response};
//!
//! let mut buffer = LineBuffer::new();
//! buffer.extend(b"OK Pleased to meet you\r\nD 50%25\n");
//!
//! let hello = buffer.next_line().unwrap().unwrap();
//! assert_eq!(
//!     Response::parse(&hello).unwrap(),
//!     Response::Ok(Some("Pleased to meet you".to_owned()))
//! );
//!
//! let data = buffer.next_line().unwrap().unwrap();
//! assert_eq!(Response::parse(&data).unwrap(), Response::Data(b"50%".to_vec()));
//! ```

mod error;
mod escape;
mod line;
mod response;

pub use error::{AssuanError, EOF_CODE, ErrorCode, USER_CODE_MAX, USER_CODE_MIN};
pub use escape::{escape_data, escape_into, escaped_len, unescape};
pub use line::{FramingError, LINE_BUFFER_SIZE, LineBuffer, MAX_LINE_LENGTH};
pub use response::{Response, split_command};
