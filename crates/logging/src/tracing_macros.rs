//! crates/logging/src/tracing_macros.rs
//! Convenience macros for Assuan-specific tracing.
//!
//! These macros wrap the standard tracing macros with the targets used by
//! the engine's subsystems.

/// Emit a pipe transport trace.
///
/// # Example
/// ```ignore
/// trace_io!("reader thread read {} bytes", n);
/// ```
#[macro_export]
macro_rules! trace_io {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "assuan::io", $($arg)*);
    };
}

/// Emit a protocol line trace.
///
/// # Example
/// ```ignore
/// trace_proto!("<- {}", line);
/// ```
#[macro_export]
macro_rules! trace_proto {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "assuan::proto", $($arg)*);
    };
}

/// Emit a command dispatch trace.
///
/// # Example
/// ```ignore
/// trace_cmd!("dispatching {}", name);
/// ```
#[macro_export]
macro_rules! trace_cmd {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "assuan::cmd", $($arg)*);
    };
}

/// Emit a connection bootstrap trace.
///
/// # Example
/// ```ignore
/// trace_connect!("spawned server pid {}", pid);
/// ```
#[macro_export]
macro_rules! trace_connect {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "assuan::connect", $($arg)*);
    };
}
