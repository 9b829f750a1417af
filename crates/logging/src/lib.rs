#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the diagnostic plumbing shared by the Assuan workspace:
//! a small set of debug categories, a verbosity configuration that maps onto
//! `tracing` filter directives, subscriber initialisation, and helpers that
//! render protocol bytes safely.
//!
//! # Design
//!
//! Each subsystem emits events under a fixed target (`assuan::io`,
//! `assuan::proto`, `assuan::cmd`, `assuan::connect`) through the
//! [`trace_io!`], [`trace_proto!`], [`trace_cmd!`] and [`trace_connect!`]
//! macros. [`VerbosityConfig`] records a level per [`DebugFlag`] and renders
//! it as an `EnvFilter` directive string which [`init_tracing`] installs on a
//! stderr formatter. The [`LOG_ENV`] variable overrides the derived filter.
//!
//! # Invariants
//!
//! - Diagnostics never go to stdout; pipe servers use stdout for protocol
//!   traffic.
//! - Lines belonging to a confidential command are never rendered; callers
//!   go through [`render_line`], which substitutes
//!   [`CONFIDENTIAL_PLACEHOLDER`].
//!
//! # Examples
//!
//! ```
//! use logging::{DebugFlag, VerbosityConfig};
//!
//! let mut config = VerbosityConfig::from_verbose_level(1);
//! config.apply_debug_flag("proto2").unwrap();
//!
//! assert_eq!(config.debug.get(DebugFlag::Proto), 2);
//! assert!(config.filter_directives().contains("assuan::proto=trace"));
//! ```
//!
//! # See also
//!
//! - [`tracing_subscriber::EnvFilter`] for the directive syntax accepted by
//!   [`LOG_ENV`].

mod config;
mod levels;
mod sanitize;
mod tracing_bridge;
mod tracing_macros;

pub use config::VerbosityConfig;
pub use levels::{DebugFlag, DebugLevels};
pub use sanitize::{
    CONFIDENTIAL_PLACEHOLDER, FULL_LOGGING_ENV, full_logging, log_prefix, log_tag, render_buffer,
    render_line, sanitize, set_log_prefix,
};
pub use tracing_bridge::{LOG_ENV, build_filter, init_tracing};

