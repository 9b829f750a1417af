//! Callbacks the embedding application attaches to a session.

use std::fmt;
use std::sync::Arc;

use protocol::AssuanError;

use crate::session::Session;

/// Called for `BYE`, `RESET` and `CANCEL`.
pub type NotifyHook = Arc<dyn Fn(&mut Session) + Send + Sync>;

/// Receives the argument line of `INPUT` or `OUTPUT` after the descriptor
/// was bound.
pub type LineHook = Arc<dyn Fn(&mut Session, &str) + Send + Sync>;

/// Receives `OPTION` key and value; the value is empty when none was given.
pub type OptionHook = Arc<dyn Fn(&mut Session, &str, &str) -> Result<(), AssuanError> + Send + Sync>;

/// Runs after every command with its final result.
pub type PostCommandHook = Arc<dyn Fn(&mut Session, &Result<(), AssuanError>) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) bye: Option<NotifyHook>,
    pub(crate) reset: Option<NotifyHook>,
    pub(crate) cancel: Option<NotifyHook>,
    pub(crate) option: Option<OptionHook>,
    pub(crate) input: Option<LineHook>,
    pub(crate) output: Option<LineHook>,
    pub(crate) post_command: Option<PostCommandHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("bye", &self.bye.is_some())
            .field("reset", &self.reset.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("option", &self.option.is_some())
            .field("input", &self.input.is_some())
            .field("output", &self.output.is_some())
            .field("post_command", &self.post_command.is_some())
            .finish()
    }
}

impl Session {
    /// Runs `hook` when the peer sends `BYE`.
    pub fn register_bye_notify(&mut self, hook: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.hooks.bye = Some(Arc::new(hook));
    }

    /// Runs `hook` when the peer sends `RESET`.
    pub fn register_reset_notify(&mut self, hook: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.hooks.reset = Some(Arc::new(hook));
    }

    /// Runs `hook` when the peer sends `CANCEL`.
    pub fn register_cancel_notify(&mut self, hook: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.hooks.cancel = Some(Arc::new(hook));
    }

    /// Hands validated `OPTION` key/value pairs to `hook`. Without a hook
    /// every well-formed option is accepted.
    pub fn register_option_handler(
        &mut self,
        hook: impl Fn(&mut Self, &str, &str) -> Result<(), AssuanError> + Send + Sync + 'static,
    ) {
        self.hooks.option = Some(Arc::new(hook));
    }

    /// Runs `hook` after `INPUT` bound a descriptor.
    pub fn register_input_notify(&mut self, hook: impl Fn(&mut Self, &str) + Send + Sync + 'static) {
        self.hooks.input = Some(Arc::new(hook));
    }

    /// Runs `hook` after `OUTPUT` bound a descriptor.
    pub fn register_output_notify(&mut self, hook: impl Fn(&mut Self, &str) + Send + Sync + 'static) {
        self.hooks.output = Some(Arc::new(hook));
    }

    /// Runs `hook` after every command, successful or not.
    pub fn register_post_cmd_notify(
        &mut self,
        hook: impl Fn(&mut Self, &Result<(), AssuanError>) + Send + Sync + 'static,
    ) {
        self.hooks.post_command = Some(Arc::new(hook));
    }

    pub(crate) fn run_notify(&mut self, hook: Option<NotifyHook>) {
        if let Some(hook) = hook {
            hook(self);
        }
    }
}
