//! crates/logging/src/levels.rs
//! Debug flag enum and per-flag level storage.

/// Diagnostic categories emitted by the Assuan engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DebugFlag {
    /// Pipe transport threads and raw reads/writes.
    Io,
    /// Protocol lines sent and received.
    Proto,
    /// Command dispatch and handler results.
    Cmd,
    /// Process spawning, handshake and teardown.
    Connect,
}

impl DebugFlag {
    /// Every flag, in declaration order.
    pub const ALL: [Self; 4] = [Self::Io, Self::Proto, Self::Cmd, Self::Connect];

    /// Returns the token used on the command line (`io`, `proto`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Proto => "proto",
            Self::Cmd => "cmd",
            Self::Connect => "connect",
        }
    }

    /// Returns the `tracing` target events for this flag are emitted under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Io => "assuan::io",
            Self::Proto => "assuan::proto",
            Self::Cmd => "assuan::cmd",
            Self::Connect => "assuan::connect",
        }
    }

    /// Looks up a flag by its command-line token.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.name() == name)
    }
}

/// Debug verbosity levels for each flag.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct DebugLevels {
    /// Transport level.
    pub io: u8,
    /// Protocol line level.
    pub proto: u8,
    /// Command dispatch level.
    pub cmd: u8,
    /// Connection bootstrap level.
    pub connect: u8,
}

impl DebugLevels {
    /// Get the level for a specific flag.
    pub fn get(&self, flag: DebugFlag) -> u8 {
        match flag {
            DebugFlag::Io => self.io,
            DebugFlag::Proto => self.proto,
            DebugFlag::Cmd => self.cmd,
            DebugFlag::Connect => self.connect,
        }
    }

    /// Set the level for a specific flag.
    pub fn set(&mut self, flag: DebugFlag, level: u8) {
        match flag {
            DebugFlag::Io => self.io = level,
            DebugFlag::Proto => self.proto = level,
            DebugFlag::Cmd => self.cmd = level,
            DebugFlag::Connect => self.connect = level,
        }
    }

    /// Set all flags to the specified level.
    pub fn set_all(&mut self, level: u8) {
        self.io = level;
        self.proto = level;
        self.cmd = level;
        self.connect = level;
    }
}
