#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipe_io` turns a blocking OS pipe into a device that can be polled and
//! waited on with timeouts. Each direction is served by a dedicated worker
//! thread that performs the blocking system call, so the thread driving a
//! protocol session (or an event loop) never blocks on the pipe itself.
//!
//! # Design
//!
//! - [`PipeDevice`] owns one descriptor and at most one reader and one
//!   writer thread, spawned on first use.
//! - The reader fills a [`RingBuffer`] of [`BUFFER_SIZE`] bytes and records
//!   EOF or the first error; the writer drains a single slot of the same
//!   size.
//! - Each worker follows the [`WorkerState`] machine. Teardown wakes every
//!   [`WaitPoint`] a worker or its consumer can be parked on before joining.
//! - Descriptors are owned by their device; there is no process-wide table.
//!
//! # Invariants
//!
//! - Bytes are delivered in the order they were written.
//! - After EOF or an error has been reported once, reads report it again
//!   immediately without touching the pipe.
//! - [`PipeDevice::close`] is idempotent and releases the descriptor once,
//!   after both workers have been joined.
//!
//! # Examples
//!
//! ```
//! use pipe_io::make_pair_of_connected_pipes;
//!
//! let (reader, writer) = make_pair_of_connected_pipes().unwrap();
//! assert_eq!(writer.write(b"hello\n").unwrap(), 6);
//! writer.close();
//!
//! let mut buf = [0u8; 16];
//! let n = reader.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello\n");
//! assert_eq!(reader.read(&mut buf).unwrap(), 0);
//! ```

mod device;
mod handle;
mod pair;
mod reader;
mod ring;
mod state;
mod writer;

pub use device::{OpenMode, PipeDevice, START_TIMEOUT};
pub use handle::PipeHandle;
pub use pair::make_pair_of_connected_pipes;
pub use reader::Notifier;
pub use ring::{BUFFER_SIZE, RingBuffer};
pub use state::{WaitPoint, WorkerState};
