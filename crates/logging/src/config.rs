//! crates/logging/src/config.rs
//! Verbosity configuration and its translation into filter directives.

use super::levels::{DebugFlag, DebugLevels};

/// Combined verbosity configuration for the debug flags.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VerbosityConfig {
    /// Debug flag levels.
    pub debug: DebugLevels,
}

impl VerbosityConfig {
    /// Create a new configuration from a `-v` count.
    ///
    /// Level 0 only reports warnings. Each additional level enables more of
    /// the engine, ending with every flag at trace detail.
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();

        match level {
            0 => {}
            1 => {
                config.debug.connect = 1;
                config.debug.cmd = 1;
            }
            2 => {
                config.debug.connect = 1;
                config.debug.cmd = 1;
                config.debug.proto = 1;
            }
            3 => {
                config.debug.connect = 2;
                config.debug.cmd = 2;
                config.debug.proto = 2;
                config.debug.io = 1;
            }
            _ => config.debug.set_all(2),
        }

        config
    }

    /// Apply a single debug flag token (e.g., "proto2", "io").
    pub fn apply_debug_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_flag_token(token)?;

        if name == "all" {
            self.debug.set_all(level);
            return Ok(());
        }

        let flag = DebugFlag::from_name(name).ok_or_else(|| format!("unknown debug flag: {name}"))?;
        self.debug.set(flag, level);
        Ok(())
    }

    /// Renders the configuration as `tracing-subscriber` filter directives.
    ///
    /// Level 1 maps to `debug`, level 2 and above to `trace`. Everything else
    /// stays at `warn`.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let mut directives = String::from("warn");
        for flag in DebugFlag::ALL {
            let level = match self.debug.get(flag) {
                0 => continue,
                1 => "debug",
                _ => "trace",
            };
            directives.push(',');
            directives.push_str(flag.target());
            directives.push('=');
            directives.push_str(level);
        }
        directives
    }
}

/// Parse a flag token like "proto2" into ("proto", 2) or "cmd" into ("cmd", 1).
fn parse_flag_token(token: &str) -> Result<(&str, u8), String> {
    if token.is_empty() {
        return Err("empty flag token".to_string());
    }

    match token.find(|c: char| c.is_ascii_digit()) {
        Some(pos) => {
            let name = &token[..pos];
            let level = token[pos..]
                .parse::<u8>()
                .map_err(|_| format!("invalid level in flag: {token}"))?;
            Ok((name, level))
        }
        None => Ok((token, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_level_zero_only_warns() {
        let config = VerbosityConfig::from_verbose_level(0);
        assert_eq!(config.filter_directives(), "warn");
    }

    #[test]
    fn verbose_level_two_enables_protocol_lines() {
        let config = VerbosityConfig::from_verbose_level(2);

        assert_eq!(config.debug.proto, 1);
        assert_eq!(config.debug.cmd, 1);
        assert_eq!(config.debug.io, 0);
    }

    #[test]
    fn high_verbose_levels_trace_everything() {
        let config = VerbosityConfig::from_verbose_level(9);
        let directives = config.filter_directives();

        assert!(directives.contains("assuan::io=trace"));
        assert!(directives.contains("assuan::connect=trace"));
    }

    #[test]
    fn parse_flag_token_defaults_to_level_one() {
        assert_eq!(parse_flag_token("io").unwrap(), ("io", 1));
        assert_eq!(parse_flag_token("proto2").unwrap(), ("proto", 2));
        assert!(parse_flag_token("").is_err());
        assert!(parse_flag_token("cmd999").is_err());
    }

    #[test]
    fn apply_debug_flag_sets_named_flag() {
        let mut config = VerbosityConfig::default();
        config.apply_debug_flag("proto2").unwrap();

        assert_eq!(config.debug.proto, 2);
        assert_eq!(
            config.filter_directives(),
            "warn,assuan::proto=trace"
        );
    }

    #[test]
    fn apply_debug_flag_accepts_all() {
        let mut config = VerbosityConfig::default();
        config.apply_debug_flag("all").unwrap();

        for flag in DebugFlag::ALL {
            assert_eq!(config.debug.get(flag), 1);
        }
    }

    #[test]
    fn apply_debug_flag_rejects_unknown_names() {
        let mut config = VerbosityConfig::default();
        let err = config.apply_debug_flag("deltasum").unwrap_err();
        assert!(err.contains("unknown debug flag"));
    }
}
