//! Runtime settings for lz-cli
//!
//! Settings come from the environment because they have to be known before the command tree,
//! and with it the argument parser, exists.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::discovery::Source;
use crate::manifest::{ManifestDir, inherit_path};
use crate::modules::Registry;

/// Overrides the manifest directory search
pub const COMMANDS_DIR_ENV: &str = "LZ_CLI_COMMANDS_DIR";
/// Enables logging to a file instead of stderr
pub const LOG_FILE_ENV: &str = "LZ_CLI_LOG_FILE";

/// Manifest directory looked up in the current directory and its parents
const SEARCH_DIR: &str = ".lz-cli/commands";

/// Errors that can occur while resolving settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Command directory not found: {path}")]
    CommandsDirNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Directory of command manifests, if any
    pub commands_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

impl Settings {
    /// Reads settings from the environment, relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownWorkingDirectory` if the cwd cannot be determined, or
    /// `ConfigError::CommandsDirNotFound` if an explicitly configured directory is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        Self::resolve(env_path(COMMANDS_DIR_ENV), env_path(LOG_FILE_ENV), &cwd)
    }

    /// Resolves settings against `cwd`, searching for a manifest directory when none is given.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CommandsDirNotFound` if `commands_dir` is not a directory.
    pub fn resolve(
        commands_dir: Option<PathBuf>,
        log_file: Option<PathBuf>,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let commands_dir = match commands_dir {
            Some(dir) => {
                let dir = inherit_path(cwd, Some(dir));
                let dir = dir
                    .canonicalize()
                    .map_err(|e| ConfigError::CommandsDirNotFound {
                        path: dir.clone(),
                        source: Some(e),
                    })?;
                if !dir.is_dir() {
                    return Err(ConfigError::CommandsDirNotFound {
                        path: dir,
                        source: None,
                    });
                }
                Some(dir)
            }
            None => find_commands_dir(cwd),
        };
        Ok(Settings {
            commands_dir,
            log_file: log_file.map(|file| inherit_path(cwd, Some(file))),
        })
    }

    /// Module sources in the order they are assembled: builtins, then manifests
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        let mut sources = vec![Source::Builtin(Registry::builtin())];
        if let Some(dir) = &self.commands_dir {
            sources.push(Source::Manifests(ManifestDir::new(dir.clone())));
        }
        sources
    }
}

/// Searches `start` and its parents for a manifest directory
#[must_use]
pub fn find_commands_dir(start: &Path) -> Option<PathBuf> {
    let mut path = start.to_path_buf();
    loop {
        let candidate = path.join(SEARCH_DIR);
        if candidate.is_dir() {
            return candidate.canonicalize().ok().or(Some(candidate));
        }
        if !path.pop() {
            return None;
        }
    }
}
