//! crates/logging/src/tracing_bridge.rs
//! Subscriber setup mapping the debug flags onto `tracing` targets.
//!
//! Every component of the engine emits events under one of the
//! `assuan::*` targets listed by [`DebugFlag::target`]. Initialisation turns a
//! [`VerbosityConfig`] into an [`EnvFilter`] so only the requested categories
//! reach the formatter.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! init_tracing(&config);
//!
//! tracing::debug!(target: "assuan::proto", "-> OK");
//! ```
//!
//! [`DebugFlag::target`]: crate::DebugFlag::target

use super::config::VerbosityConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable whose value replaces the directives derived from the
/// verbosity configuration.
pub const LOG_ENV: &str = "OC_ASSUAN_LOG";

/// Builds the filter for `config`, honouring [`LOG_ENV`] when it is set.
#[must_use]
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| EnvFilter::new(config.filter_directives())),
        _ => EnvFilter::new(config.filter_directives()),
    }
}

/// Initialise tracing with the given verbosity configuration.
///
/// Events are formatted to stderr so stdout stays free for protocol traffic.
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated initialisation harmless.
pub fn init_tracing(config: &VerbosityConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_reported_not_fatal() {
        let config = VerbosityConfig::from_verbose_level(1);
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }

    #[test]
    fn build_filter_renders_derived_directives() {
        let config = VerbosityConfig::from_verbose_level(4);
        let filter = build_filter(&config).to_string();
        if std::env::var_os(LOG_ENV).is_none() {
            assert!(filter.contains("assuan::proto=trace"));
        }
    }
}
