use std::fmt;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgMatches;

/// Result of running a command's action. Errors are opaque to the assembly core.
pub type ActionResult = Result<ExitCode, Box<dyn std::error::Error + Send + Sync>>;

/// Context handed to an action when its command is the deepest one matched
pub struct Invocation<'a> {
    /// Space separated path from the root, e.g. `lz-cli keypair enum`
    pub command: &'a str,
    pub matches: &'a ArgMatches,
}

/// Behaviour attached to a command
pub trait Action: Send + Sync {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns whatever the command's own logic considers a failure.
    fn run(&self, invocation: &Invocation<'_>) -> ActionResult;
}

impl<F> Action for F
where
    F: Fn(&Invocation<'_>) -> ActionResult + Send + Sync,
{
    fn run(&self, invocation: &Invocation<'_>) -> ActionResult {
        self(invocation)
    }
}

/// A command as exported by a module: its `clap` definition and optional action
#[derive(Clone)]
pub struct CommandHandle {
    command: clap::Command,
    action: Option<Arc<dyn Action>>,
}

impl CommandHandle {
    #[must_use]
    pub fn new(command: clap::Command) -> Self {
        Self {
            command,
            action: None,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Action + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.command.get_name()
    }

    /// All aliases, visible and hidden
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.command.get_all_aliases()
    }

    /// Every name this command can be invoked by
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name()).chain(self.aliases())
    }

    /// Returns the first of this command's names that `other` also answers to
    #[must_use]
    pub fn clash_with(&self, other: &CommandHandle) -> Option<&str> {
        self.names()
            .find(|name| other.names().any(|existing| existing == *name))
    }

    #[must_use]
    pub fn command(&self) -> &clap::Command {
        &self.command
    }

    #[must_use]
    pub fn action(&self) -> Option<&dyn Action> {
        self.action.as_deref()
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("name", &self.name())
            .field("aliases", &self.aliases().collect::<Vec<_>>())
            .field("action", &self.action.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_include_all_aliases() {
        let handle = CommandHandle::new(
            clap::Command::new("enum")
                .visible_alias("e")
                .alias("enumerate"),
        );
        let names: Vec<&str> = handle.names().collect();
        assert_eq!(names, vec!["enum", "e", "enumerate"]);
    }

    #[test]
    fn test_clash_by_alias() {
        let first = CommandHandle::new(clap::Command::new("list").alias("ls"));
        let second = CommandHandle::new(clap::Command::new("ls"));
        assert_eq!(second.clash_with(&first), Some("ls"));
        assert_eq!(first.clash_with(&second), Some("ls"));
    }

    #[test]
    fn test_no_clash_for_distinct_names() {
        let first = CommandHandle::new(clap::Command::new("list").alias("ls"));
        let second = CommandHandle::new(clap::Command::new("show").alias("s"));
        assert_eq!(second.clash_with(&first), None);
    }

    fn succeed(_: &Invocation<'_>) -> ActionResult {
        Ok(ExitCode::SUCCESS)
    }

    #[test]
    fn test_action_is_optional() {
        let group = CommandHandle::new(clap::Command::new("keypair"));
        assert!(group.action().is_none());
        let leaf = group.with_action(succeed);
        assert!(leaf.action().is_some());
    }
}
