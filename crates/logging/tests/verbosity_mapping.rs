//! Integration tests for verbosity level mapping and line rendering.
//!
//! Test coverage:
//! 1. `-v` counts enable the debug categories progressively
//! 2. `--debug` tokens override individual categories
//! 3. Filter directives name the `assuan::*` targets
//! 4. Protocol lines are rendered safely for the log

use logging::{
    CONFIDENTIAL_PLACEHOLDER, DebugFlag, VerbosityConfig, render_buffer, render_line, sanitize,
};

// ============================================================================
// Verbose level mapping
// ============================================================================

#[test]
fn verbose_levels_enable_categories_progressively() {
    let mut previous = 0;
    for level in 0..=4 {
        let config = VerbosityConfig::from_verbose_level(level);
        let enabled: u32 = DebugFlag::ALL
            .into_iter()
            .map(|flag| u32::from(config.debug.get(flag)))
            .sum();
        assert!(
            enabled >= previous,
            "level {level} enabled less than level {}",
            level.saturating_sub(1)
        );
        previous = enabled;
    }
}

#[test]
fn verbose_level_1_covers_commands_and_connections() {
    let config = VerbosityConfig::from_verbose_level(1);

    assert_eq!(config.debug.get(DebugFlag::Cmd), 1);
    assert_eq!(config.debug.get(DebugFlag::Connect), 1);
    assert_eq!(config.debug.get(DebugFlag::Proto), 0);
    assert_eq!(config.debug.get(DebugFlag::Io), 0);
}

#[test]
fn verbose_level_3_reaches_the_transport() {
    let config = VerbosityConfig::from_verbose_level(3);

    assert_eq!(config.debug.get(DebugFlag::Io), 1);
    assert_eq!(config.debug.get(DebugFlag::Proto), 2);
}

// ============================================================================
// Debug tokens
// ============================================================================

#[test]
fn debug_tokens_override_the_verbose_level() {
    let mut config = VerbosityConfig::from_verbose_level(4);
    config.apply_debug_flag("io0").unwrap();

    assert_eq!(config.debug.get(DebugFlag::Io), 0);
    assert!(!config.filter_directives().contains("assuan::io"));
    assert!(config.filter_directives().contains("assuan::cmd=trace"));
}

#[test]
fn debug_all_with_level_sets_every_category() {
    let mut config = VerbosityConfig::default();
    config.apply_debug_flag("all2").unwrap();

    for flag in DebugFlag::ALL {
        assert_eq!(config.debug.get(flag), 2, "{flag:?}");
    }
}

#[test]
fn malformed_debug_tokens_are_rejected() {
    let mut config = VerbosityConfig::default();

    assert!(config.apply_debug_flag("").is_err());
    assert!(config.apply_debug_flag("proto300").is_err());
    assert!(config.apply_debug_flag("deltasum").is_err());
    assert_eq!(config, VerbosityConfig::default());
}

// ============================================================================
// Filter directives
// ============================================================================

#[test]
fn directives_start_from_warn_and_list_enabled_targets() {
    let mut config = VerbosityConfig::default();
    config.apply_debug_flag("connect").unwrap();
    config.apply_debug_flag("proto2").unwrap();

    assert_eq!(
        config.filter_directives(),
        "warn,assuan::proto=trace,assuan::connect=debug"
    );
}

// ============================================================================
// Line rendering
// ============================================================================

#[test]
fn protocol_lines_render_without_raw_control_bytes() {
    let rendered = sanitize(b"D line\nwith\x07bell");
    assert_eq!(rendered, "D line\\nwith\\x07bell");
    assert!(!rendered.bytes().any(|b| b.is_ascii_control()));
}

#[test]
fn binary_payloads_render_as_hex() {
    assert_eq!(render_buffer(&[0x00, 0xff, 0x10], false), "[ 00 ff 10 ]");
}

#[test]
fn confidential_lines_never_leak() {
    let rendered = render_line(b"D my-passphrase", true);
    assert_eq!(rendered, CONFIDENTIAL_PLACEHOLDER);
    assert!(!rendered.contains("passphrase"));
}
