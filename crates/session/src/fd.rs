//! Closing descriptors announced by `INPUT` and `OUTPUT`.
//!
//! The peer names these descriptors by number; the session takes ownership
//! of them once bound and releases them on `BYE`, `RESET` or an explicit
//! close.

#![allow(unsafe_code)]

use std::io;

/// Closes a descriptor (POSIX) or handle value (Windows) by number.
#[cfg(unix)]
pub(crate) fn close_raw(fd: i64) -> io::Result<()> {
    let fd = libc::c_int::try_from(fd)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "descriptor out of range"))?;
    // SAFETY: the descriptor was handed to this session by the peer and is
    // closed at most once; the caller clears its record before calling.
    let rc = unsafe { libc::close(fd) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Closes a descriptor (POSIX) or handle value (Windows) by number.
#[cfg(windows)]
pub(crate) fn close_raw(fd: i64) -> io::Result<()> {
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};

    let handle = fd as isize as HANDLE;
    // SAFETY: the handle value was handed to this session by the peer and is
    // closed at most once; the caller clears its record before calling.
    let ok = unsafe { CloseHandle(handle) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
