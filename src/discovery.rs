//! Locating candidate command modules
//!
//! Modules come from one of two sources: the builtin registry compiled into the binary, or a
//! directory of YAML manifests on disk. Both are addressed by `/` separated paths relative to
//! their root and matched with glob patterns. Neither source promises any ordering.

use std::io;
use std::path::{Component, Path, PathBuf};

use glob::MatchOptions;
use log::debug;
use thiserror::Error;

use crate::manifest::ManifestDir;
use crate::modules::Registry;

/// Errors that can occur while locating modules
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Unable to read command directory {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Command directory is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Invalid module pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Unable to traverse {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8(PathBuf),
}

/// `*` and `?` never cross a `/`; only `**` spans directories
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Which kind of module an assembly pass handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Groups,
    Leaves,
}

/// File naming convention of a module source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// File name that declares a command group for its directory
    pub group_file: &'static str,
    pub group_pattern: &'static str,
    pub leaf_pattern: &'static str,
}

impl Layout {
    #[must_use]
    pub fn pattern(&self, pass: Pass) -> &'static str {
        match pass {
            Pass::Groups => self.group_pattern,
            Pass::Leaves => self.leaf_pattern,
        }
    }
}

pub const BUILTIN_LAYOUT: Layout = Layout {
    group_file: "index",
    group_pattern: "**/index",
    leaf_pattern: "**/*.cmd",
};

pub const MANIFEST_LAYOUT: Layout = Layout {
    group_file: "index.yaml",
    group_pattern: "**/index.yaml",
    leaf_pattern: "**/*.cmd.yaml",
};

/// A place command modules are loaded from
#[derive(Debug)]
pub enum Source {
    Builtin(Registry),
    Manifests(ManifestDir),
}

impl Source {
    #[must_use]
    pub fn layout(&self) -> Layout {
        match self {
            Source::Builtin(_) => BUILTIN_LAYOUT,
            Source::Manifests(_) => MANIFEST_LAYOUT,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        match self {
            Source::Builtin(registry) => registry.root(),
            Source::Manifests(dir) => dir.root(),
        }
    }

    /// Lists the relative paths of all modules matching `pattern`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError` if the pattern is invalid or the manifest directory cannot be
    /// traversed.
    pub fn discover(&self, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
        let found = match self {
            Source::Builtin(registry) => discover_entries(registry, pattern)?,
            Source::Manifests(dir) => discover_files(dir.root(), pattern)?,
        };
        debug!(
            "Discovered {} module(s) matching `{pattern}` in {}",
            found.len(),
            self.root().display()
        );
        Ok(found)
    }
}

fn compile(pattern: &str) -> Result<glob::Pattern, DiscoveryError> {
    glob::Pattern::new(pattern).map_err(|source| DiscoveryError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn discover_entries(registry: &Registry, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
    let pattern = compile(pattern)?;
    Ok(registry
        .paths()
        .filter(|path| pattern.matches_with(path, MATCH_OPTIONS))
        .map(str::to_string)
        .collect())
}

/// Lists files below `root` matching `pattern`, relative to `root`.
///
/// # Errors
///
/// Returns `DiscoveryError::Root` if `root` cannot be read, and `DiscoveryError::Walk` if any
/// directory below it fails to enumerate.
pub fn discover_files(root: &Path, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
    let root_error = |source| DiscoveryError::Root {
        path: root.to_path_buf(),
        source,
    };
    let root = std::fs::canonicalize(root).map_err(root_error)?;
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root));
    }
    std::fs::read_dir(&root).map_err(|source| DiscoveryError::Root {
        path: root.clone(),
        source,
    })?;

    // Validate the caller's pattern on its own so errors don't mention the root
    compile(pattern)?;
    let root_str = root
        .to_str()
        .ok_or_else(|| DiscoveryError::NonUtf8(root.clone()))?;
    let full_pattern = format!(
        "{}/{pattern}",
        glob::Pattern::escape(root_str.trim_end_matches('/'))
    );
    let entries = glob::glob_with(&full_pattern, MATCH_OPTIONS).map_err(|source| {
        DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DiscoveryError::Walk {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            found.push(relative_path(&root, &path)?);
        }
    }
    Ok(found)
}

/// Converts `path` into a `/` separated path relative to `root`
fn relative_path(root: &Path, path: &Path) -> Result<String, DiscoveryError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts = relative
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .map(|component| {
            component
                .as_os_str()
                .to_str()
                .ok_or_else(|| DiscoveryError::NonUtf8(path.to_path_buf()))
        })
        .collect::<Result<Vec<&str>, DiscoveryError>>()?;
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "command:\n  name: x\n").unwrap();
    }

    fn sorted(mut paths: Vec<String>) -> Vec<String> {
        paths.sort();
        paths
    }

    #[test]
    fn test_group_pattern_matches_root_and_nested() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.yaml");
        touch(dir.path(), "deploy/index.yaml");
        touch(dir.path(), "deploy/aws/index.yaml");
        touch(dir.path(), "deploy/up.cmd.yaml");

        let found = discover_files(dir.path(), MANIFEST_LAYOUT.group_pattern).unwrap();
        assert_eq!(
            sorted(found),
            vec!["deploy/aws/index.yaml", "deploy/index.yaml", "index.yaml"]
        );
    }

    #[test]
    fn test_leaf_pattern_skips_groups() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.yaml");
        touch(dir.path(), "deploy/up.cmd.yaml");
        touch(dir.path(), "status.cmd.yaml");
        touch(dir.path(), "notes.txt");

        let found = discover_files(dir.path(), MANIFEST_LAYOUT.leaf_pattern).unwrap();
        assert_eq!(sorted(found), vec!["deploy/up.cmd.yaml", "status.cmd.yaml"]);
    }

    #[test]
    fn test_directories_are_not_modules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("odd.cmd.yaml")).unwrap();
        let found = discover_files(dir.path(), MANIFEST_LAYOUT.leaf_pattern).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = discover_files(&missing, MANIFEST_LAYOUT.group_pattern);
        match result {
            Err(DiscoveryError::Root { path, .. }) => assert_eq!(path, missing),
            other => panic!("Expected DiscoveryError::Root, got: {other:?}"),
        }
    }

    #[test]
    fn test_file_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "file.yaml");
        let result = discover_files(&dir.path().join("file.yaml"), "**/*.yaml");
        assert!(matches!(result, Err(DiscoveryError::NotADirectory(_))));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_files(dir.path(), "a**b");
        match result {
            Err(DiscoveryError::Pattern { pattern, .. }) => assert_eq!(pattern, "a**b"),
            other => panic!("Expected DiscoveryError::Pattern, got: {other:?}"),
        }
    }

    #[test]
    fn test_builtin_registry_patterns() {
        let source = Source::Builtin(Registry::builtin());
        let groups = source.discover(BUILTIN_LAYOUT.group_pattern).unwrap();
        assert_eq!(sorted(groups), vec!["index", "keypair/index"]);
        let leaves = source.discover(BUILTIN_LAYOUT.leaf_pattern).unwrap();
        assert_eq!(leaves, vec!["keypair/enum.cmd"]);
    }
}
