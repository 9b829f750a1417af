//! The threaded pipe device.

use std::fs::File;
use std::io::{self, Read, Write};
use std::process::{ChildStdin, ChildStdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(windows)]
use std::os::windows::io::OwnedHandle;

use logging::trace_io;

use crate::handle::{PipeHandle, raw_of};
use crate::reader::{self, Notifier, ReaderShared};
use crate::ring::BUFFER_SIZE;
use crate::state::{Monitor, WaitPoint, WorkerState, deadline_after};
use crate::writer::{self, WriterShared};

/// How long starting a worker waits for the thread to report it is running.
pub const START_TIMEOUT: Duration = Duration::from_secs(1);

/// Directions a device serves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Only the read side exists.
    ReadOnly,
    /// Only the write side exists.
    WriteOnly,
    /// Both sides share one descriptor.
    ReadWrite,
}

impl OpenMode {
    /// Returns `true` when the device has a read side.
    #[must_use]
    pub const fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Returns `true` when the device has a write side.
    #[must_use]
    pub const fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

trait SharedSide: Send + Sync + 'static {
    type Data: Send;
    const THREAD_NAME: &'static str;

    fn monitor(&self) -> &Monitor<Self::Data>;
    fn run(&self, file: &File);
}

impl SharedSide for ReaderShared {
    type Data = reader::ReaderData;
    const THREAD_NAME: &'static str = "pipe-reader";

    fn monitor(&self) -> &Monitor<Self::Data> {
        &self.monitor
    }

    fn run(&self, file: &File) {
        reader::run(self, file);
    }
}

impl SharedSide for WriterShared {
    type Data = writer::WriterData;
    const THREAD_NAME: &'static str = "pipe-writer";

    fn monitor(&self) -> &Monitor<Self::Data> {
        &self.monitor
    }

    fn run(&self, file: &File) {
        writer::run(self, file);
    }
}

/// One direction of a device: shared state plus its lazily spawned thread.
#[derive(Debug)]
struct Worker<S> {
    shared: Arc<S>,
    started: OnceLock<bool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<S: SharedSide> Worker<S> {
    fn new(shared: S) -> Self {
        Self {
            shared: Arc::new(shared),
            started: OnceLock::new(),
            thread: Mutex::new(None),
        }
    }

    fn start(&self, file: Option<Arc<File>>) -> bool {
        *self.started.get_or_init(|| {
            let Some(file) = file else {
                return false;
            };
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(S::THREAD_NAME.to_owned())
                .spawn(move || shared.run(&file));
            match spawned {
                Ok(handle) => {
                    *self.thread.lock().expect("worker handle mutex poisoned") = Some(handle);
                }
                Err(err) => {
                    trace_io!(thread = S::THREAD_NAME, error = %err, "failed to spawn worker");
                    return false;
                }
            }

            let monitor = self.shared.monitor();
            let guard = monitor.lock();
            let (_guard, started) = monitor.wait_until(
                guard,
                WaitPoint::Started,
                deadline_after(Some(START_TIMEOUT)),
                |g| g.state != WorkerState::NotStarted,
            );
            if !started {
                trace_io!(thread = S::THREAD_NAME, "worker did not confirm start in time");
            }
            started
        })
    }

    fn tried_to_start(&self) -> bool {
        self.started.get().is_some()
    }

    fn cancel(&self) {
        self.shared.monitor().request_cancel();
    }

    fn join(&self) {
        let handle = self
            .thread
            .lock()
            .expect("worker handle mutex poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                trace_io!(thread = S::THREAD_NAME, "worker thread panicked");
            }
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "pipe device is closed")
}

fn not_started_error(side: &str) -> io::Error {
    io::Error::other(format!("{side} thread did not start"))
}

/// Presents one OS pipe as streams whose blocking I/O happens on dedicated
/// worker threads.
///
/// The reader thread fills a ring of [`BUFFER_SIZE`] bytes; the writer
/// thread drains a single slot of the same size. Threads are spawned on
/// first use. Callers on another thread can poll
/// [`read_would_block`](Self::read_would_block) and
/// [`write_would_block`](Self::write_would_block) or wait with a timeout
/// instead of blocking on the pipe.
///
/// [`close`](Self::close) drains pending writes, cancels and joins both
/// workers and only then releases the descriptor. A reader blocked in the
/// underlying read is released by the peer closing its end, so `close` may
/// block until that happens.
#[derive(Debug)]
pub struct PipeDevice {
    mode: OpenMode,
    descriptor: i64,
    file: Mutex<Option<Arc<File>>>,
    open: AtomicBool,
    closing: AtomicBool,
    reader: Option<Worker<ReaderShared>>,
    writer: Option<Worker<WriterShared>>,
}

impl PipeDevice {
    /// Opens a device over `handle` serving the directions in `mode`.
    pub fn open(handle: impl Into<PipeHandle>, mode: OpenMode) -> Self {
        let file = handle.into().into_file();
        let descriptor = raw_of(&file);
        trace_io!(fd = descriptor, ?mode, "opening pipe device");
        Self {
            mode,
            descriptor,
            file: Mutex::new(Some(Arc::new(file))),
            open: AtomicBool::new(true),
            closing: AtomicBool::new(false),
            reader: mode.readable().then(|| Worker::new(ReaderShared::new())),
            writer: mode.writable().then(|| Worker::new(WriterShared::new())),
        }
    }

    /// Opens a device over an owned descriptor.
    #[cfg(unix)]
    pub fn from_owned_fd(fd: OwnedFd, mode: OpenMode) -> Self {
        Self::open(fd, mode)
    }

    /// Opens a device over an owned handle.
    #[cfg(windows)]
    pub fn from_owned_handle(handle: OwnedHandle, mode: OpenMode) -> Self {
        Self::open(handle, mode)
    }

    /// Reads what a child process writes to its standard output.
    pub fn from_child_stdout(stdout: ChildStdout) -> Self {
        Self::open(stdout, OpenMode::ReadOnly)
    }

    /// Writes to a child process' standard input.
    pub fn from_child_stdin(stdin: ChildStdin) -> Self {
        Self::open(stdin, OpenMode::WriteOnly)
    }

    /// Reads from the read end of an anonymous pipe.
    pub fn from_pipe_reader(reader: io::PipeReader) -> Self {
        Self::open(reader, OpenMode::ReadOnly)
    }

    /// Writes to the write end of an anonymous pipe.
    pub fn from_pipe_writer(writer: io::PipeWriter) -> Self {
        Self::open(writer, OpenMode::WriteOnly)
    }

    /// Directions this device serves.
    #[must_use]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns `true` until [`close`](Self::close) has completed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Raw descriptor number while open.
    #[must_use]
    pub fn descriptor(&self) -> Option<i64> {
        self.is_open().then_some(self.descriptor)
    }

    fn current_file(&self) -> Option<Arc<File>> {
        self.file
            .lock()
            .expect("pipe device file mutex poisoned")
            .clone()
    }

    fn reader(&self) -> io::Result<&Worker<ReaderShared>> {
        self.reader.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "pipe device is not readable")
        })
    }

    fn writer(&self) -> io::Result<&Worker<WriterShared>> {
        self.writer.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "pipe device is not writable")
        })
    }

    /// Starts the reader thread once and waits up to [`START_TIMEOUT`] for
    /// it to run. Returns `false` for write-only or closed devices or when
    /// the thread failed to confirm its start.
    pub fn start_reader_thread(&self) -> bool {
        match &self.reader {
            Some(worker) if self.is_open() => worker.start(self.current_file()),
            Some(worker) => worker.started.get().copied().unwrap_or(false),
            None => false,
        }
    }

    /// Starts the writer thread; see
    /// [`start_reader_thread`](Self::start_reader_thread).
    pub fn start_writer_thread(&self) -> bool {
        match &self.writer {
            Some(worker) if self.is_open() => worker.start(self.current_file()),
            Some(worker) => worker.started.get().copied().unwrap_or(false),
            None => false,
        }
    }

    /// Copies buffered bytes into `buf`, blocking until data, EOF or an
    /// error is available.
    ///
    /// Returns `Ok(0)` at EOF. Once EOF or an error has been reported, every
    /// later call reports it again without waiting and without touching the
    /// pipe.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let worker = self.reader()?;
        if !self.is_open() {
            return Err(closed_error());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.start_reader_thread() {
            return Err(not_started_error("reader"));
        }

        let monitor = &worker.shared.monitor;
        let mut guard = monitor.lock();
        if guard.data.eof_short_cut {
            return match &guard.data.error {
                Some(record) => Err(record.to_io_error()),
                None => Ok(0),
            };
        }

        if !guard.data.ready() {
            trace_io!(fd = self.descriptor, "read waiting for data");
            guard = monitor
                .wait_until(guard, WaitPoint::DataAvailable, None, |g| {
                    g.data.ready() || g.finished()
                })
                .0;
        }

        if guard.data.ring.is_empty() {
            guard.data.eof_short_cut = true;
            return match &guard.data.error {
                Some(record) => Err(record.to_io_error()),
                None => Ok(0),
            };
        }

        let count = guard.data.ring.pop(buf);
        monitor.notify(WaitPoint::SpaceAvailable);
        Ok(count)
    }

    /// Bytes buffered by the reader thread. Starts the thread if needed.
    pub fn bytes_available(&self) -> usize {
        let Some(worker) = &self.reader else {
            return 0;
        };
        self.start_reader_thread();
        worker.shared.monitor.lock().data.ring.len()
    }

    /// Returns `true` while a [`read`](Self::read) would have to wait.
    /// Starts the reader thread if needed.
    pub fn read_would_block(&self) -> bool {
        let Some(worker) = &self.reader else {
            return false;
        };
        self.start_reader_thread();
        !worker.shared.monitor.lock().data.ready()
    }

    /// Waits until bytes, EOF or an error are available.
    ///
    /// `None` waits without bound. Returns `false` when the timeout expired
    /// first or the device cannot read.
    pub fn wait_for_ready_read(&self, timeout: Option<Duration>) -> bool {
        let Some(worker) = &self.reader else {
            return false;
        };
        if !self.is_open() || !self.start_reader_thread() {
            return false;
        }
        let monitor = &worker.shared.monitor;
        let guard = monitor.lock();
        let (guard, _) = monitor.wait_until(
            guard,
            WaitPoint::DataAvailable,
            deadline_after(timeout),
            |g| g.data.ready() || g.finished(),
        );
        guard.data.ready()
    }

    /// Returns `true` when a complete line is buffered.
    pub fn can_read_line(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|worker| worker.shared.monitor.lock().data.ring.contains(b'\n'))
    }

    /// Returns `true` once nothing more can be read.
    pub fn at_end(&self) -> bool {
        if !self.is_open() {
            return true;
        }
        self.reader.as_ref().is_none_or(|worker| {
            let guard = worker.shared.monitor.lock();
            guard.data.ring.is_empty() && (guard.data.eof || guard.data.error.is_some())
        })
    }

    /// Registers a callback run on the reader thread whenever new bytes,
    /// EOF or an error become available.
    pub fn set_ready_read_notifier(&self, notifier: Option<Notifier>) {
        if let Some(worker) = &self.reader {
            worker.shared.set_ready_read(notifier);
        }
    }

    /// Hands up to [`BUFFER_SIZE`] bytes of `data` to the writer thread,
    /// blocking until its slot is free.
    ///
    /// Returns the number of bytes accepted, which may be less than
    /// requested. Fails once a write error has been recorded.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        let worker = self.writer()?;
        if !self.is_open() || self.closing.load(Ordering::Acquire) {
            return Err(closed_error());
        }
        if data.is_empty() {
            return Ok(0);
        }
        if !self.start_writer_thread() {
            return Err(not_started_error("writer"));
        }

        let monitor = &worker.shared.monitor;
        let guard = monitor.lock();
        let (mut guard, _) = monitor.wait_until(guard, WaitPoint::Drained, None, |g| {
            g.data.drained() || g.finished()
        });
        if let Some(record) = &guard.data.error {
            return Err(record.to_io_error());
        }
        if guard.finished() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "writer thread stopped",
            ));
        }

        let count = data.len().min(BUFFER_SIZE);
        guard.data.slot.extend_from_slice(&data[..count]);
        trace_io!(fd = self.descriptor, bytes = count, "queued bytes for writer");
        monitor.notify(WaitPoint::DataAvailable);
        Ok(count)
    }

    /// Returns `true` while a [`write`](Self::write) would have to wait.
    pub fn write_would_block(&self) -> bool {
        self.writer.as_ref().is_some_and(|worker| {
            let guard = worker.shared.monitor.lock();
            guard.data.pending() > 0 && guard.data.error.is_none()
        })
    }

    /// Bytes handed to the writer thread and not yet written.
    pub fn bytes_to_write(&self) -> usize {
        self.writer
            .as_ref()
            .map_or(0, |worker| worker.shared.monitor.lock().data.pending())
    }

    /// Waits until the writer slot has drained or a write error occurred.
    ///
    /// `None` waits without bound. Returns `false` when the timeout expired
    /// first.
    pub fn wait_for_bytes_written(&self, timeout: Option<Duration>) -> bool {
        let Some(worker) = &self.writer else {
            return true;
        };
        if !worker.tried_to_start() {
            return true;
        }
        let monitor = &worker.shared.monitor;
        let guard = monitor.lock();
        monitor
            .wait_until(guard, WaitPoint::Drained, deadline_after(timeout), |g| {
                g.data.drained() || g.finished()
            })
            .1
    }

    /// Registers a callback run on the writer thread after each chunk has
    /// been written.
    pub fn set_bytes_written_notifier(&self, notifier: Option<Notifier>) {
        if let Some(worker) = &self.writer {
            worker.shared.set_bytes_written(notifier);
        }
    }

    /// The recorded transport error, if any.
    pub fn last_error(&self) -> Option<io::Error> {
        let from_reader = self.reader.as_ref().and_then(|worker| {
            worker
                .shared
                .monitor
                .lock()
                .data
                .error
                .as_ref()
                .map(reader::ErrorRecord::to_io_error)
        });
        from_reader.or_else(|| {
            self.writer.as_ref().and_then(|worker| {
                worker
                    .shared
                    .monitor
                    .lock()
                    .data
                    .error
                    .as_ref()
                    .map(reader::ErrorRecord::to_io_error)
            })
        })
    }

    /// Drains pending writes, stops both workers and releases the
    /// descriptor. Calling it again does nothing.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        trace_io!(fd = self.descriptor, "closing pipe device");

        if let Some(worker) = &self.writer {
            if worker.tried_to_start() && worker.shared.monitor.lock().data.pending() > 0 {
                self.wait_for_bytes_written(None);
            }
        }

        if let Some(worker) = &self.reader {
            worker.cancel();
        }
        if let Some(worker) = &self.writer {
            worker.cancel();
        }

        trace_io!(fd = self.descriptor, "joining writer");
        if let Some(worker) = &self.writer {
            worker.join();
        }
        trace_io!(fd = self.descriptor, "joining reader");
        if let Some(worker) = &self.reader {
            worker.join();
        }

        drop(
            self.file
                .lock()
                .expect("pipe device file mutex poisoned")
                .take(),
        );
        self.open.store(false, Ordering::Release);
        trace_io!(fd = self.descriptor, "pipe device closed");
    }
}

impl Drop for PipeDevice {
    fn drop(&mut self) {
        self.close();
    }
}

impl Read for &PipeDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeDevice::read(self, buf)
    }
}

impl Read for PipeDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeDevice::read(self, buf)
    }
}

impl Write for &PipeDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeDevice::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        PipeDevice::flush_pending(self)
    }
}

impl Write for PipeDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeDevice::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending()
    }
}

impl PipeDevice {
    fn flush_pending(&self) -> io::Result<()> {
        self.wait_for_bytes_written(None);
        match self.writer.as_ref() {
            Some(worker) => match &worker.shared.monitor.lock().data.error {
                Some(record) => Err(record.to_io_error()),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}
