//! Loading discovered modules into records

use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use log::debug;
use thiserror::Error;

use crate::commands::handle::CommandHandle;
use crate::discovery::Source;
use crate::manifest::ManifestFile;

/// Errors that can occur while loading a module
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{path} does not contain valid command")]
    MissingCommandExport { path: PathBuf },
    #[error("Unable to read module {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to parse module {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid module {path}: {message}")]
    Validation { path: PathBuf, message: String },
}

/// A loaded module and where it came from
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub absolute_path: PathBuf,
    /// `/` separated path relative to the source root
    pub relative_path: String,
    /// Directory part of `relative_path`, `.` for the root
    pub directory: String,
    /// File name that marks a group module in this record's source
    pub group_file: &'static str,
    pub command: CommandHandle,
}

/// Containing directory of a `/` separated path, `.` when there is none
#[must_use]
pub fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent,
        _ => ".",
    }
}

impl Source {
    async fn load_command(
        &self,
        relative: &str,
        absolute: &Path,
    ) -> Result<Option<CommandHandle>, LoadError> {
        match self {
            Source::Builtin(registry) => {
                Ok(registry.get(relative).and_then(|entry| (entry.export)()))
            }
            Source::Manifests(_) => {
                let contents = tokio::fs::read_to_string(absolute)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: absolute.to_path_buf(),
                        source,
                    })?;
                let directory = absolute.parent().unwrap_or(absolute);
                ManifestFile::parse(&contents, absolute)?
                    .command
                    .map(|command| command.into_handle(absolute, directory))
                    .transpose()
            }
        }
    }

    async fn load(&self, relative: String) -> Result<ModuleRecord, LoadError> {
        let absolute_path = self.root().join(&relative);
        let command = self
            .load_command(&relative, &absolute_path)
            .await?
            .ok_or_else(|| LoadError::MissingCommandExport {
                path: absolute_path.clone(),
            })?;
        let directory = dirname(&relative).to_string();
        Ok(ModuleRecord {
            absolute_path,
            relative_path: relative,
            directory,
            group_file: self.layout().group_file,
            command,
        })
    }
}

/// Loads all `paths` from `source` concurrently.
///
/// Every load runs to completion before the batch is judged, so one failing module never
/// leaves others half-read.
///
/// # Errors
///
/// Returns the first `LoadError` in path order, e.g. `LoadError::MissingCommandExport` for a
/// module that exports no command.
pub async fn load_modules(
    source: &Source,
    paths: Vec<String>,
) -> Result<Vec<ModuleRecord>, LoadError> {
    let count = paths.len();
    let results = join_all(paths.into_iter().map(|path| source.load(path))).await;
    let records = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    debug!("Loaded {count} module(s) from {}", source.root().display());
    Ok(records)
}
