//! Command manifests: user-authored commands declared as YAML files
//!
//! A manifest directory mirrors the command tree. `index.yaml` declares the group for its
//! directory and `*.cmd.yaml` declares a leaf. Every manifest exports its command under the
//! `command` key; leaves with a `run` line execute it through `sh`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::commands::handle::CommandHandle;
use crate::commands::shell::{FORWARDED_ARGS, ShellAction};
use crate::loader::LoadError;

/// A directory of command manifests
#[derive(Debug, Clone)]
pub struct ManifestDir {
    root: PathBuf,
}

impl ManifestDir {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Contents of a manifest file
#[derive(Debug, Deserialize)]
pub struct ManifestFile {
    pub command: Option<ManifestCommand>,
}

/// The command a manifest exports
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestCommand {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub about: Option<String>,
    pub version: Option<String>,
    pub run: Option<String>,
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ManifestFile {
    /// Parses a manifest.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Yaml` if the contents are not a valid manifest.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, LoadError> {
        serde_yaml::from_str(contents).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves `child` against `parent` unless it is absolute
#[must_use]
pub fn inherit_path(parent: &Path, child: Option<PathBuf>) -> PathBuf {
    match child {
        Some(child) if child.is_absolute() => child,
        Some(child) => parent.join(child),
        None => parent.to_path_buf(),
    }
}

impl ManifestCommand {
    /// Builds the command handle; `directory` is the absolute directory of the manifest.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Validation` if the name, an alias or the run line is blank.
    pub fn into_handle(self, path: &Path, directory: &Path) -> Result<CommandHandle, LoadError> {
        let invalid = |message: &str| LoadError::Validation {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("command has an empty name"));
        }
        if self.aliases.iter().any(|alias| alias.trim().is_empty()) {
            return Err(invalid("command has an empty alias"));
        }
        if self.run.as_ref().is_some_and(|run| run.trim().is_empty()) {
            return Err(invalid("command has an empty run line"));
        }

        let mut command = clap::Command::new(self.name.clone()).visible_aliases(self.aliases);
        if let Some(about) = self.about {
            command = command.about(about);
        }
        if let Some(version) = self.version {
            command = command.version(version);
        }

        let Some(run) = self.run else {
            return Ok(CommandHandle::new(command));
        };
        let command = command.arg(
            clap::Arg::new(FORWARDED_ARGS)
                .help("Arguments passed on to the command")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        );
        let action = ShellAction {
            name: self.name,
            cmd: run,
            cwd: inherit_path(directory, self.cwd),
            env: self.env,
        };
        Ok(CommandHandle::new(command).with_action(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(yaml: &str) -> Result<CommandHandle, LoadError> {
        let path = Path::new("/cmds/deploy/up.cmd.yaml");
        let manifest = ManifestFile::parse(yaml, path)?;
        manifest
            .command
            .expect("manifest exports a command")
            .into_handle(path, Path::new("/cmds/deploy"))
    }

    #[test]
    fn test_group_manifest_has_no_action() {
        let group = handle("command:\n  name: deploy\n  about: Deploy things\n").unwrap();
        assert_eq!(group.name(), "deploy");
        assert!(group.action().is_none());
    }

    #[test]
    fn test_leaf_manifest_with_aliases() {
        let leaf = handle("command:\n  name: up\n  aliases: [u, start]\n  run: ./up.sh\n").unwrap();
        assert_eq!(leaf.names().collect::<Vec<_>>(), vec!["up", "u", "start"]);
        assert!(leaf.action().is_some());
    }

    #[test]
    fn test_missing_command_key() {
        let path = Path::new("/cmds/empty.cmd.yaml");
        let manifest = ManifestFile::parse("other: 1\n", path).unwrap();
        assert!(manifest.command.is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = handle("command:\n  name: up\n  rnu: typo\n");
        assert!(matches!(result, Err(LoadError::Yaml { .. })));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        match handle("command:\n  name: '  '\n") {
            Err(LoadError::Validation { message, .. }) => {
                assert!(message.contains("empty name"), "got: {message}");
            }
            other => panic!("Expected Validation error, got: {other:?}"),
        }
    }

    #[test]
    fn test_inherit_path() {
        let dir = Path::new("/cmds/deploy");
        assert_eq!(inherit_path(dir, None), PathBuf::from("/cmds/deploy"));
        assert_eq!(
            inherit_path(dir, Some(PathBuf::from("scripts"))),
            PathBuf::from("/cmds/deploy/scripts")
        );
        assert_eq!(
            inherit_path(dir, Some(PathBuf::from("/opt"))),
            PathBuf::from("/opt")
        );
    }
}
