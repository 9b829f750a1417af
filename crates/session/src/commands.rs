//! Command registry: maps command names to handlers.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use protocol::AssuanError;

use crate::session::Session;

/// Handles one command line.
///
/// `args` is everything after the command name with leading blanks removed;
/// handlers parse it themselves. Returning an error makes the session answer
/// with the matching `ERR` line; returning [`AssuanError::eof`] closes the
/// connection after `OK closing connection`.
pub trait CommandHandler: Send + Sync {
    /// Runs the command.
    fn handle(&self, session: &mut Session, args: &str) -> Result<(), AssuanError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&mut Session, &str) -> Result<(), AssuanError> + Send + Sync,
{
    fn handle(&self, session: &mut Session, args: &str) -> Result<(), AssuanError> {
        self(session, args)
    }
}

struct Entry {
    name: String,
    handler: Arc<dyn CommandHandler>,
}

/// Insertion-ordered mapping from command names to handlers.
///
/// Lookups try the exact name first and fall back to the first entry that
/// matches ignoring ASCII case. Registering an existing exact name replaces
/// its handler in place.
#[derive(Default)]
pub struct CommandTable {
    entries: Vec<Entry>,
    exact: FxHashMap<String, usize>,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl CommandTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing an entry with the same
    /// exact name.
    pub fn insert(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        if let Some(&index) = self.exact.get(name) {
            self.entries[index].handler = handler;
            return;
        }
        self.exact.insert(name.to_owned(), self.entries.len());
        self.entries.push(Entry {
            name: name.to_owned(),
            handler,
        });
    }

    /// Finds the handler for `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        let index = self.exact.get(name).copied().or_else(|| {
            self.entries
                .iter()
                .position(|entry| entry.name.eq_ignore_ascii_case(name))
        })?;
        Some(Arc::clone(&self.entries[index].handler))
    }

    /// Returns `true` when a command of that name (in any case) exists.
    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains_key(name)
            || self
                .entries
                .iter()
                .any(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ErrorCode;

    fn failing(code: ErrorCode) -> Arc<dyn CommandHandler> {
        Arc::new(move |_: &mut Session, _: &str| Err(AssuanError::new(code)))
    }

    fn code_of(table: &CommandTable, name: &str) -> Option<ErrorCode> {
        let handler = table.lookup(name)?;
        let (mut session, _peer) = crate::session::tests::server_pair();
        handler.handle(&mut session, "").err().map(|err| err.code())
    }

    #[test]
    fn exact_match_wins_over_case_insensitive() {
        let mut table = CommandTable::new();
        table.insert("foo", failing(ErrorCode::User(1001)));
        table.insert("FOO", failing(ErrorCode::User(1002)));

        assert_eq!(code_of(&table, "FOO"), Some(ErrorCode::User(1002)));
        assert_eq!(code_of(&table, "foo"), Some(ErrorCode::User(1001)));
        assert_eq!(code_of(&table, "Foo"), Some(ErrorCode::User(1001)));
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut table = CommandTable::new();
        table.insert("A", failing(ErrorCode::User(1001)));
        table.insert("B", failing(ErrorCode::User(1002)));
        table.insert("A", failing(ErrorCode::User(1003)));

        assert_eq!(table.names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(code_of(&table, "a"), Some(ErrorCode::User(1003)));
    }

    #[test]
    fn unknown_names_are_absent() {
        let table = CommandTable::new();
        assert!(table.lookup("NOP").is_none());
        assert!(!table.contains("nop"));
        assert!(table.is_empty());
    }
}
