//! Background writer: drains a single slot into the pipe.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;

use logging::trace_io;

use crate::reader::{ErrorRecord, Notifier};
use crate::state::{Monitor, WaitPoint};

/// Writer state guarded by the monitor.
#[derive(Debug, Default)]
pub(crate) struct WriterData {
    /// Bytes handed over by the device and not yet picked up.
    pub(crate) slot: Vec<u8>,
    /// Bytes picked up by the thread and currently being written.
    pub(crate) in_flight: usize,
    pub(crate) error: Option<ErrorRecord>,
}

impl WriterData {
    pub(crate) fn pending(&self) -> usize {
        self.slot.len() + self.in_flight
    }

    /// The slot can accept new bytes, or never will again.
    pub(crate) fn drained(&self) -> bool {
        self.pending() == 0 || self.error.is_some()
    }
}

/// State shared between a device and its writer thread.
pub(crate) struct WriterShared {
    pub(crate) monitor: Monitor<WriterData>,
    bytes_written: Mutex<Option<Notifier>>,
}

impl fmt::Debug for WriterShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterShared")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl WriterShared {
    pub(crate) fn new() -> Self {
        Self {
            monitor: Monitor::new(WriterData::default()),
            bytes_written: Mutex::new(None),
        }
    }

    pub(crate) fn set_bytes_written(&self, notifier: Option<Notifier>) {
        *self
            .bytes_written
            .lock()
            .expect("bytes-written notifier mutex poisoned") = notifier;
    }

    fn notify_bytes_written(&self) {
        let notifier = self
            .bytes_written
            .lock()
            .expect("bytes-written notifier mutex poisoned")
            .clone();
        if let Some(notifier) = notifier {
            notifier();
        }
    }
}

fn write_all_retrying(mut sink: &File, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        match sink.write(data) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(written) => data = &data[written..],
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Body of the writer thread.
///
/// Waits for the slot to fill, writes it completely outside the lock and
/// reports the slot as drained. The first write error is recorded and ends
/// the thread.
pub(crate) fn run(shared: &WriterShared, sink: &File) {
    let monitor = &shared.monitor;

    let mut guard = monitor.lock();
    if !monitor.mark_running(&mut guard) {
        monitor.mark_stopped(&mut guard);
        return;
    }
    trace_io!("writer thread started");

    loop {
        while guard.running() && guard.data.slot.is_empty() {
            monitor.notify(WaitPoint::Drained);
            guard = monitor.wait(guard, WaitPoint::DataAvailable);
        }
        if !guard.running() {
            break;
        }

        let chunk = std::mem::take(&mut guard.data.slot);
        guard.data.in_flight = chunk.len();
        drop(guard);
        trace_io!(bytes = chunk.len(), "writer writing");
        let result = write_all_retrying(sink, &chunk);
        guard = monitor.lock();
        guard.data.in_flight = 0;

        match result {
            Ok(()) => {
                monitor.notify(WaitPoint::Drained);
                drop(guard);
                shared.notify_bytes_written();
                guard = monitor.lock();
            }
            Err(err) => {
                trace_io!(error = %err, "writer got error");
                guard.data.error = Some(ErrorRecord::capture(&err));
                guard.data.slot.clear();
                monitor.notify(WaitPoint::Drained);
                break;
            }
        }
    }

    trace_io!("writer thread terminated");
    monitor.mark_stopped(&mut guard);
}
