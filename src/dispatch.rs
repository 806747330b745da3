//! Assembling the tree and handing the command line to it

use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::ArgMatches;
use log::{debug, info};
use thiserror::Error;

use crate::CliError;
use crate::commands::handle::Invocation;
use crate::config::Settings;
use crate::discovery::{Pass, Source};
use crate::loader::load_modules;
use crate::tree::{CommandTree, Family, NodeId};

/// Exit code for a group invoked without one of its subcommands
const USAGE_EXIT_CODE: u8 = 2;

/// Errors that can occur once the tree is handed the command line
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] clap::Error),
    #[error("{command} failed: {source}")]
    Action {
        command: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Matched subcommand `{name}` has no command under `{parent}`")]
    UnroutedSubcommand { parent: String, name: String },
    #[error("Unable to print help: {0}")]
    Io(#[from] io::Error),
}

/// Runs the group pass and then the leaf pass over all sources.
///
/// # Errors
///
/// Returns the first discovery, load or assembly error; no partial tree is ever returned.
pub async fn assemble(sources: &[Source]) -> Result<CommandTree, CliError> {
    let mut family = Family::new();
    for pass in [Pass::Groups, Pass::Leaves] {
        let mut batch = Vec::new();
        for source in sources {
            let paths = source.discover(source.layout().pattern(pass))?;
            batch.extend(load_modules(source, paths).await?);
        }
        debug!("{pass:?} pass: attaching {} module(s)", batch.len());
        family.attach_all(batch)?;
    }
    Ok(family.into_tree()?)
}

/// Assembles the tree for `settings` and dispatches `argv` to it.
///
/// # Errors
///
/// Returns `CliError` for assembly failures, parse errors and failing commands.
pub async fn run<I, T>(settings: &Settings, argv: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match &settings.commands_dir {
        Some(dir) => info!("Using command directory {}", dir.display()),
        None => debug!("No command directory found, using builtin commands only"),
    }
    let tree = assemble(&settings.sources()).await?;
    Ok(tree.dispatch(argv)?)
}

impl CommandTree {
    /// Folds the tree into a `clap` command rooted at the root module
    #[must_use]
    pub fn to_command(&self) -> clap::Command {
        self.build(self.root())
    }

    fn build(&self, id: NodeId) -> clap::Command {
        let handle = self.handle(id);
        let mut command = handle.command().clone();
        let children = self.children(id);
        if !children.is_empty() && handle.action().is_none() {
            command = command
                .subcommand_required(true)
                .arg_required_else_help(true);
        }
        for &child in children {
            command = command.subcommand(self.build(child));
        }
        command
    }

    /// Follows the matched subcommand chain down to the deepest node
    fn route<'m>(
        &self,
        matches: &'m ArgMatches,
    ) -> Result<(NodeId, &'m ArgMatches), DispatchError> {
        let mut node = self.root();
        let mut matches = matches;
        while let Some((name, sub_matches)) = matches.subcommand() {
            node = self
                .find_child(node, name)
                .ok_or_else(|| DispatchError::UnroutedSubcommand {
                    parent: self.full_name(node),
                    name: name.to_string(),
                })?;
            matches = sub_matches;
        }
        Ok((node, matches))
    }

    /// Parses `argv` and runs the action of the command it selects.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Parse` for anything `clap` rejects, including `--help` and
    /// `--version`, and `DispatchError::Action` if the selected command fails.
    pub fn dispatch<I, T>(&self, argv: I) -> Result<ExitCode, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.to_command().try_get_matches_from(argv)?;
        let (node, matches) = self.route(&matches)?;
        let command = self.full_name(node);

        let Some(action) = self.handle(node).action() else {
            debug!("{command} has no action, showing help");
            self.build(node).bin_name(command).print_help()?;
            return Ok(ExitCode::from(USAGE_EXIT_CODE));
        };

        info!("Running {command} ({})", self.source(node).display());
        let invocation = Invocation {
            command: &command,
            matches,
        };
        action
            .run(&invocation)
            .map_err(|source| DispatchError::Action {
                command: command.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::commands::handle::{Action, ActionResult, CommandHandle};
    use crate::loader::{ModuleRecord, dirname};

    struct Counter(Arc<AtomicUsize>);

    impl Action for Counter {
        fn run(&self, invocation: &Invocation<'_>) -> ActionResult {
            assert_eq!(invocation.command, "root tools count");
            let by = invocation.matches.get_one::<usize>("by").copied().unwrap_or(1);
            self.0.fetch_add(by, Ordering::SeqCst);
            Ok(ExitCode::SUCCESS)
        }
    }

    fn fail(_: &Invocation<'_>) -> ActionResult {
        Err("boom".into())
    }

    fn record(relative: &str, handle: CommandHandle) -> ModuleRecord {
        ModuleRecord {
            absolute_path: PathBuf::from("/cmds").join(relative),
            relative_path: relative.to_string(),
            directory: dirname(relative).to_string(),
            group_file: "index",
            command: handle,
        }
    }

    fn tree(counter: &Arc<AtomicUsize>) -> CommandTree {
        let mut family = Family::new();
        family
            .attach_all(vec![
                record("index", CommandHandle::new(clap::Command::new("root"))),
                record(
                    "tools/index",
                    CommandHandle::new(clap::Command::new("tools").alias("t")),
                ),
            ])
            .unwrap();
        let count = CommandHandle::new(
            clap::Command::new("count").arg(
                clap::Arg::new("by")
                    .long("by")
                    .value_parser(clap::value_parser!(usize)),
            ),
        )
        .with_action(Counter(Arc::clone(counter)));
        let fail = CommandHandle::new(clap::Command::new("fail")).with_action(fail);
        family
            .attach_all(vec![
                record("tools/count.cmd", count),
                record("tools/fail.cmd", fail),
            ])
            .unwrap();
        family.into_tree().unwrap()
    }

    #[test]
    fn test_dispatch_runs_leaf_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tree = tree(&counter);
        tree.dispatch(["root", "tools", "count", "--by", "3"])
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dispatch_through_alias() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tree = tree(&counter);
        tree.dispatch(["root", "t", "count"]).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_group_requires_subcommand() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tree = tree(&counter);
        let result = tree.dispatch(["root", "tools"]);
        match result {
            Err(DispatchError::Parse(e)) => assert_eq!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ),
            other => panic!("Expected a clap error, got: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_subcommand_is_a_parse_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tree = tree(&counter);
        let result = tree.dispatch(["root", "tools", "nope"]);
        assert!(matches!(result, Err(DispatchError::Parse(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_action_failure_names_command() {
        let counter = Arc::new(AtomicUsize::new(0));
        let tree = tree(&counter);
        let err = tree.dispatch(["root", "tools", "fail"]).unwrap_err();
        assert_eq!(err.to_string(), "root tools fail failed: boom");
    }

    #[test]
    fn test_to_command_mirrors_tree() {
        let counter = Arc::new(AtomicUsize::new(0));
        let command = tree(&counter).to_command();
        let tools = command.find_subcommand("tools").unwrap();
        let names: Vec<&str> = tools.get_subcommands().map(clap::Command::get_name).collect();
        assert_eq!(names, vec!["count", "fail"]);
        assert!(tools.is_subcommand_required_set());
    }

    #[tokio::test]
    async fn test_run_with_builtin_commands_only() {
        let settings = Settings::default();
        let result = run(&settings, ["lz-cli", "keypair", "--help"]).await;
        match result {
            Err(CliError::Dispatch(DispatchError::Parse(e))) => {
                assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp);
            }
            other => panic!("Expected help, got: {other:?}"),
        }
    }
}
