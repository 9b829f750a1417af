//! Owned OS pipe handles accepted by [`PipeDevice`](crate::PipeDevice).

use std::fs::File;
use std::io;
use std::process::{ChildStderr, ChildStdin, ChildStdout};

#[cfg(unix)]
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
#[cfg(windows)]
use std::os::windows::io::{AsHandle, AsRawHandle, OwnedHandle};

/// An owned pipe descriptor (POSIX) or handle (Windows).
///
/// Every conversion takes ownership; the descriptor is closed exactly once,
/// when the device holding it is closed or dropped.
#[derive(Debug)]
pub struct PipeHandle(File);

impl PipeHandle {
    /// Duplicates the process' standard input.
    pub fn stdin() -> io::Result<Self> {
        #[cfg(unix)]
        let owned = io::stdin().as_fd().try_clone_to_owned()?;
        #[cfg(windows)]
        let owned = io::stdin().as_handle().try_clone_to_owned()?;
        Ok(Self::from(owned))
    }

    /// Duplicates the process' standard output.
    pub fn stdout() -> io::Result<Self> {
        #[cfg(unix)]
        let owned = io::stdout().as_fd().try_clone_to_owned()?;
        #[cfg(windows)]
        let owned = io::stdout().as_handle().try_clone_to_owned()?;
        Ok(Self::from(owned))
    }

    /// Returns the raw descriptor number, widened for display and comparison.
    #[must_use]
    pub fn raw(&self) -> i64 {
        raw_of(&self.0)
    }

    pub(crate) fn into_file(self) -> File {
        self.0
    }
}

#[cfg(unix)]
pub(crate) fn raw_of(file: &File) -> i64 {
    i64::from(file.as_raw_fd())
}

#[cfg(windows)]
pub(crate) fn raw_of(file: &File) -> i64 {
    file.as_raw_handle() as isize as i64
}

impl From<File> for PipeHandle {
    fn from(file: File) -> Self {
        Self(file)
    }
}

#[cfg(unix)]
impl From<OwnedFd> for PipeHandle {
    fn from(fd: OwnedFd) -> Self {
        Self(File::from(fd))
    }
}

#[cfg(windows)]
impl From<OwnedHandle> for PipeHandle {
    fn from(handle: OwnedHandle) -> Self {
        Self(File::from(handle))
    }
}

macro_rules! pipe_handle_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for PipeHandle {
                fn from(source: $source) -> Self {
                    #[cfg(unix)]
                    let owned = OwnedFd::from(source);
                    #[cfg(windows)]
                    let owned = OwnedHandle::from(source);
                    Self::from(owned)
                }
            }
        )+
    };
}

pipe_handle_from!(ChildStdin, ChildStdout, ChildStderr, io::PipeReader, io::PipeWriter);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_descriptor_matches_file() {
        let file = tempfile::tempfile().expect("tempfile");
        let expected = raw_of(&file);
        let handle = PipeHandle::from(file);
        assert_eq!(handle.raw(), expected);
    }

    #[test]
    fn anonymous_pipe_ends_convert() {
        let (reader, writer) = io::pipe().expect("pipe");
        let reader = PipeHandle::from(reader);
        let writer = PipeHandle::from(writer);
        assert_ne!(reader.raw(), writer.raw());
    }
}
