//! Background reader: pulls bytes from the pipe into a [`RingBuffer`].

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use logging::trace_io;

use crate::ring::RingBuffer;
use crate::state::{Monitor, WaitPoint};

/// Callback invoked from a worker thread.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

/// A transport failure saved so it can be reported more than once.
#[derive(Clone, Debug)]
pub(crate) struct ErrorRecord {
    kind: io::ErrorKind,
    raw_os_error: Option<i32>,
    message: String,
}

impl ErrorRecord {
    pub(crate) fn capture(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            raw_os_error: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    pub(crate) fn to_io_error(&self) -> io::Error {
        match self.raw_os_error {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(self.kind, self.message.clone()),
        }
    }
}

/// Reader state guarded by the monitor.
#[derive(Debug, Default)]
pub(crate) struct ReaderData {
    pub(crate) ring: RingBuffer,
    pub(crate) eof: bool,
    pub(crate) error: Option<ErrorRecord>,
    /// Set once EOF or an error has been surfaced to a consumer.
    pub(crate) eof_short_cut: bool,
}

impl ReaderData {
    /// Consumers can proceed without blocking.
    pub(crate) fn ready(&self) -> bool {
        !self.ring.is_empty() || self.eof || self.error.is_some()
    }
}

/// State shared between a device and its reader thread.
pub(crate) struct ReaderShared {
    pub(crate) monitor: Monitor<ReaderData>,
    ready_read: Mutex<Option<Notifier>>,
}

impl fmt::Debug for ReaderShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderShared")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl ReaderShared {
    pub(crate) fn new() -> Self {
        Self {
            monitor: Monitor::new(ReaderData::default()),
            ready_read: Mutex::new(None),
        }
    }

    pub(crate) fn set_ready_read(&self, notifier: Option<Notifier>) {
        *self
            .ready_read
            .lock()
            .expect("ready-read notifier mutex poisoned") = notifier;
    }

    fn notify_ready_read(&self) {
        let notifier = self
            .ready_read
            .lock()
            .expect("ready-read notifier mutex poisoned")
            .clone();
        if let Some(notifier) = notifier {
            notifier();
        }
    }
}

fn read_retrying(mut source: &File, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Body of the reader thread.
///
/// The pipe is read outside the lock. After EOF or an error the thread
/// parks on [`WaitPoint::CancelAwaited`] until teardown.
pub(crate) fn run(shared: &ReaderShared, source: &File) {
    let monitor = &shared.monitor;
    let mut scratch = vec![0u8; crate::ring::BUFFER_SIZE];

    let mut guard = monitor.lock();
    if !monitor.mark_running(&mut guard) {
        monitor.mark_stopped(&mut guard);
        return;
    }
    trace_io!("reader thread started");

    while guard.running() {
        if guard.data.eof || guard.data.error.is_some() {
            trace_io!(
                eof = guard.data.eof,
                error = guard.data.error.is_some(),
                "reader reached end of stream, waking consumers"
            );
            monitor.notify(WaitPoint::DataAvailable);
            drop(guard);
            shared.notify_ready_read();
            guard = monitor.lock();
            while guard.running() {
                guard = monitor.wait(guard, WaitPoint::CancelAwaited);
            }
            break;
        }

        if guard.data.ring.is_full() {
            trace_io!("reader buffer full, going to sleep");
            guard = monitor.wait(guard, WaitPoint::SpaceAvailable);
            continue;
        }

        guard.data.ring.rewind_if_empty();
        let room = guard.data.ring.free().min(scratch.len());
        drop(guard);
        let result = read_retrying(source, &mut scratch[..room]);
        guard = monitor.lock();

        match result {
            Ok(0) => {
                trace_io!("reader got eof");
                guard.data.eof = true;
            }
            Ok(count) => {
                let pushed = guard.data.ring.push(&scratch[..count]);
                debug_assert_eq!(pushed, count);
                trace_io!(bytes = count, buffered = guard.data.ring.len(), "reader read");
                monitor.notify(WaitPoint::DataAvailable);
                drop(guard);
                shared.notify_ready_read();
                guard = monitor.lock();
            }
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                trace_io!("reader got eof (broken pipe)");
                guard.data.eof = true;
            }
            Err(err) => {
                trace_io!(error = %err, "reader got error");
                guard.data.error = Some(ErrorRecord::capture(&err));
            }
        }
    }

    trace_io!("reader thread terminated");
    monitor.mark_stopped(&mut guard);
}
