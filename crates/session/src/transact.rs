//! Client side: sending a command and consuming its responses.

use std::fmt;

use logging::trace_cmd;
use protocol::{AssuanError, ErrorCode, Response};

use crate::session::Session;

type DataCallback<'a> = Box<dyn FnMut(&[u8]) -> Result<(), AssuanError> + 'a>;
type StatusCallback<'a> = Box<dyn FnMut(&str, &str) -> Result<(), AssuanError> + 'a>;
type InquireCallback<'a> = Box<dyn FnMut(&str, &str) -> Result<Vec<u8>, AssuanError> + 'a>;

/// Callbacks for one [`Session::transact`] exchange.
///
/// ```no_run
/// # fn demo(session: &mut session::Session) -> Result<(), protocol::AssuanError> {
/// use session::Transaction;
///
/// let mut payload = Vec::new();
/// session.transact(
///     "GETINFO version",
///     Transaction::new().on_data(|chunk| {
///         payload.extend_from_slice(chunk);
///         Ok(())
///     }),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Transaction<'a> {
    data: Option<DataCallback<'a>>,
    status: Option<StatusCallback<'a>>,
    inquire: Option<InquireCallback<'a>>,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("data", &self.data.is_some())
            .field("status", &self.status.is_some())
            .field("inquire", &self.inquire.is_some())
            .finish()
    }
}

impl<'a> Transaction<'a> {
    /// Creates a transaction without callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives the unescaped payload of every `D` line.
    #[must_use]
    pub fn on_data(mut self, callback: impl FnMut(&[u8]) -> Result<(), AssuanError> + 'a) -> Self {
        self.data = Some(Box::new(callback));
        self
    }

    /// Receives keyword and text of every `S` line.
    #[must_use]
    pub fn on_status(
        mut self,
        callback: impl FnMut(&str, &str) -> Result<(), AssuanError> + 'a,
    ) -> Self {
        self.status = Some(Box::new(callback));
        self
    }

    /// Answers `INQUIRE` lines with the returned bytes. An error cancels the
    /// inquiry.
    #[must_use]
    pub fn on_inquire(
        mut self,
        callback: impl FnMut(&str, &str) -> Result<Vec<u8>, AssuanError> + 'a,
    ) -> Self {
        self.inquire = Some(Box::new(callback));
        self
    }
}

impl Session {
    /// Reads the greeting that opens a connection.
    ///
    /// Comment lines are skipped and the text of the `OK` line is returned.
    /// An `ERR` greeting, or any other line, fails with
    /// [`ErrorCode::ConnectFailed`].
    pub fn read_hello(&mut self) -> Result<Option<String>, AssuanError> {
        self.require_client()?;
        loop {
            let Some(line) = self.read_line(true)? else {
                continue;
            };
            match Response::parse(&line) {
                Ok(Response::Comment(_)) => {}
                Ok(Response::Ok(text)) => return Ok(text),
                Ok(Response::Err(err)) => {
                    return Err(AssuanError::with_text(
                        ErrorCode::ConnectFailed,
                        err.to_string(),
                    ));
                }
                Ok(_) | Err(_) => {
                    return Err(AssuanError::with_text(
                        ErrorCode::ConnectFailed,
                        "unexpected greeting",
                    ));
                }
            }
        }
    }

    /// Sends `command` and processes responses until its `OK` or `ERR`.
    ///
    /// Returns the text of the `OK` line. An `ERR` line becomes the error.
    /// When a callback fails or is missing, the remaining responses are
    /// still read so the connection stays usable, and the first such error
    /// is returned.
    pub fn transact(
        &mut self,
        command: &str,
        mut transaction: Transaction<'_>,
    ) -> Result<Option<String>, AssuanError> {
        self.require_client()?;
        trace_cmd!(command = command.split(' ').next().unwrap_or_default(), "transact");
        self.write_line(command)?;

        let mut failure: Option<AssuanError> = None;
        loop {
            let Some(line) = self.read_line(true)? else {
                continue;
            };
            let response = match Response::parse(&line) {
                Ok(response) => response,
                Err(err) => {
                    failure.get_or_insert(err);
                    continue;
                }
            };

            match response {
                Response::Ok(text) => return failure.map_or(Ok(text), Err),
                Response::Err(err) => return Err(failure.unwrap_or(err)),
                Response::Comment(_) => {}
                Response::Data(payload) => {
                    let outcome = match transaction.data.as_mut() {
                        Some(callback) if failure.is_none() => callback(&payload),
                        Some(_) => Ok(()),
                        None => Err(AssuanError::new(ErrorCode::NoDataCallback)),
                    };
                    if let Err(err) = outcome {
                        failure.get_or_insert(err);
                    }
                }
                Response::Status { keyword, text } => {
                    if let Some(callback) = transaction.status.as_mut() {
                        if failure.is_none() {
                            if let Err(err) = callback(&keyword, &text) {
                                failure = Some(err);
                            }
                        }
                    }
                }
                Response::Inquire { keyword, params } => {
                    let answer = match transaction.inquire.as_mut() {
                        Some(callback) if failure.is_none() => callback(&keyword, &params),
                        Some(_) => Err(AssuanError::new(ErrorCode::Canceled)),
                        None => Err(AssuanError::new(ErrorCode::NoInquireCallback)),
                    };
                    match answer {
                        Ok(bytes) => {
                            self.send_data(&bytes)?;
                            self.flush_data()?;
                            self.write_line("END")?;
                        }
                        Err(err) => {
                            self.write_line("CAN")?;
                            failure.get_or_insert(err);
                        }
                    }
                }
                Response::End | Response::Cancel => {
                    failure.get_or_insert(AssuanError::new(ErrorCode::InvalidResponse));
                }
            }
        }
    }
}
