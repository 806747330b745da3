//! Assembly of the command tree
//!
//! Each module's position in the tree is derived purely from its path: a group file stands for
//! its directory, anything else for itself. The `Family` is the assembly context mapping those
//! positions to nodes. Batches of records are attached in order of depth so a node's parent
//! always exists before the node itself, and siblings are checked for clashing names and
//! aliases before they are linked.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::commands::handle::CommandHandle;
use crate::loader::{ModuleRecord, dirname};

/// Position of the root command
pub const ROOT_KEY: &str = ".";

/// Subcommand name `clap` generates for every command with subcommands
pub const HELP_COMMAND: &str = "help";

/// Index of a node in the tree's arena
pub type NodeId = usize;

/// Errors that can occur while linking modules into a tree
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("{path} has duplicate command `{name}`, previous is {previous}")]
    DuplicateCommand {
        name: String,
        path: PathBuf,
        previous: PathBuf,
    },
    #[error("{path} cannot be attached: no command group is registered at `{parent}`")]
    OrderFault { path: PathBuf, parent: String },
    #[error("{path} declares `{name}`, which is reserved for generated help")]
    ReservedName { name: String, path: PathBuf },
    #[error("No root command is registered at `.`")]
    MissingRoot,
}

/// Tree position of a module: its directory for group files, otherwise its own path
#[must_use]
pub fn position_key(relative: &str, group_file: &str) -> String {
    let file_name = relative.rsplit('/').next().unwrap_or(relative);
    if file_name == group_file {
        dirname(relative).to_string()
    } else {
        relative.to_string()
    }
}

/// Position of the group a key attaches to
#[must_use]
pub fn parent_key(key: &str) -> &str {
    dirname(key)
}

/// Number of path segments in a key, 0 for the root
#[must_use]
pub fn depth(key: &str) -> usize {
    if key == ROOT_KEY {
        0
    } else {
        key.split('/').count()
    }
}

#[derive(Debug)]
struct Node {
    key: String,
    source: PathBuf,
    command: CommandHandle,
    /// Back-reference for path reconstruction; children are owned through `children`
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Assembly context: positions registered so far and the nodes behind them
#[derive(Debug, Default)]
pub struct Family {
    nodes: Vec<Node>,
    positions: HashMap<String, NodeId>,
}

impl Family {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Attaches a batch of records, shallowest positions first.
    ///
    /// # Errors
    ///
    /// Returns the first `AssemblyError` hit; the family must then be discarded.
    pub fn attach_all(&mut self, mut records: Vec<ModuleRecord>) -> Result<(), AssemblyError> {
        records.sort_by_cached_key(|record| {
            let key = position_key(&record.relative_path, record.group_file);
            (depth(&key), key)
        });
        for record in records {
            self.attach(record)?;
        }
        Ok(())
    }

    /// Registers a record at its position and links it under its parent.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::OrderFault` if the parent position is not registered yet,
    /// `AssemblyError::ReservedName` if the command answers to `help`, and
    /// `AssemblyError::DuplicateCommand` if a sibling already answers to one of the names.
    pub fn attach(&mut self, record: ModuleRecord) -> Result<NodeId, AssemblyError> {
        let key = position_key(&record.relative_path, record.group_file);
        let id = self.nodes.len();
        self.nodes.push(Node {
            key: key.clone(),
            source: record.absolute_path,
            command: record.command,
            parent: None,
            children: Vec::new(),
        });

        match self.positions.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
            Entry::Occupied(entry) => {
                warn!(
                    "{} maps to `{key}` which is already taken by {}, keeping the first",
                    self.nodes[id].source.display(),
                    self.nodes[*entry.get()].source.display()
                );
            }
        }

        if key == ROOT_KEY {
            debug!("Registered root command `{}`", self.nodes[id].command.name());
            return Ok(id);
        }

        let parent_key = parent_key(&key);
        let Some(&parent) = self.positions.get(parent_key) else {
            return Err(AssemblyError::OrderFault {
                path: self.nodes[id].source.clone(),
                parent: parent_key.to_string(),
            });
        };

        let node = &self.nodes[id];
        if let Some(name) = node.command.names().find(|&name| name == HELP_COMMAND) {
            return Err(AssemblyError::ReservedName {
                name: name.to_string(),
                path: node.source.clone(),
            });
        }
        for &sibling in &self.nodes[parent].children {
            let sibling = &self.nodes[sibling];
            if let Some(name) = node.command.clash_with(&sibling.command) {
                return Err(AssemblyError::DuplicateCommand {
                    name: name.to_string(),
                    path: node.source.clone(),
                    previous: sibling.source.clone(),
                });
            }
        }

        debug!(
            "Attached `{}` at `{key}` under `{}`",
            node.command.name(),
            self.nodes[parent].key
        );
        self.nodes[parent].children.push(id);
        self.nodes[id].parent = Some(parent);
        Ok(id)
    }

    /// Finishes assembly.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::MissingRoot` if no module was registered at the root position.
    pub fn into_tree(self) -> Result<CommandTree, AssemblyError> {
        let root = *self
            .positions
            .get(ROOT_KEY)
            .ok_or(AssemblyError::MissingRoot)?;
        Ok(CommandTree {
            nodes: self.nodes,
            root,
        })
    }
}

/// A fully assembled, conflict free command tree
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl CommandTree {
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn handle(&self, id: NodeId) -> &CommandHandle {
        &self.nodes[id].command
    }

    /// Path of the module that defined a node
    #[must_use]
    pub fn source(&self, id: NodeId) -> &Path {
        &self.nodes[id].source
    }

    #[must_use]
    pub fn key(&self, id: NodeId) -> &str {
        &self.nodes[id].key
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Child of `id` answering to `name`, either by name or by alias
    #[must_use]
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.handle(child).names().any(|n| n == name))
    }

    /// Space separated names from the root down to `id`
    #[must_use]
    pub fn full_name(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            parts.push(self.handle(node).name());
            current = self.parent(node);
        }
        parts.reverse();
        parts.join(" ")
    }

    /// Full names of every node, depth first in attachment order
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            paths.push(self.full_name(id));
            stack.extend(self.children(id).iter().rev());
        }
        paths
    }
}
