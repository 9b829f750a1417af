//! Buffered `D` line output.

use std::io;

use protocol::{AssuanError, MAX_LINE_LENGTH, escape_into, escaped_len};

use crate::session::Session;

/// Escaped payload waiting to be sent as a `D` line.
#[derive(Debug, Default)]
pub(crate) struct DataOutput {
    line: Vec<u8>,
    error: Option<AssuanError>,
}

impl Session {
    /// Queues `bytes` for sending as `D` lines.
    ///
    /// Payload is escaped and cut into lines of at most
    /// [`MAX_LINE_LENGTH`] bytes; full lines are sent immediately, the rest
    /// when [`flush_data`](Self::flush_data) runs or the command completes.
    pub fn send_data(&mut self, bytes: &[u8]) -> Result<(), AssuanError> {
        if let Some(err) = &self.data.error {
            return Err(err.clone());
        }
        for &byte in bytes {
            if self.data_line_len() + escaped_len(byte) > MAX_LINE_LENGTH {
                self.emit_data_line()?;
            }
            escape_into(&[byte], &mut self.data.line);
        }
        Ok(())
    }

    /// Sends any partially filled `D` line.
    ///
    /// Reports the first error hit while sending data for this command and
    /// clears it.
    pub fn flush_data(&mut self) -> Result<(), AssuanError> {
        if let Some(err) = self.data.error.take() {
            self.data.line.clear();
            return Err(err);
        }
        if self.data.line.is_empty() {
            return Ok(());
        }
        let result = self.emit_data_line();
        self.data.error = None;
        result
    }

    /// Returns a writer whose bytes are sent as `D` lines.
    pub fn data_writer(&mut self) -> DataWriter<'_> {
        DataWriter { session: self }
    }

    fn data_line_len(&self) -> usize {
        "D ".len() + self.data.line.len()
    }

    fn emit_data_line(&mut self) -> Result<(), AssuanError> {
        let mut line = Vec::with_capacity(self.data_line_len());
        line.extend_from_slice(b"D ");
        line.append(&mut self.data.line);
        self.write_raw_line(&line).inspect_err(|err| {
            self.data.error = Some(err.clone());
        })
    }
}

/// [`io::Write`] adapter over [`Session::send_data`].
#[derive(Debug)]
pub struct DataWriter<'a> {
    session: &'a mut Session,
}

impl io::Write for DataWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.session.send_data(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.session.flush_data()?;
        Ok(())
    }
}
