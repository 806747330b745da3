//! Builtin command modules
//!
//! Every module is registered under the path it would have as a file in a command directory:
//! `index` files declare the group for their directory and `*.cmd` files declare leaf commands.
//!
//! To add a new command:
//! 1. Create a module exporting a `fn command() -> Option<CommandHandle>`
//! 2. Add a `ModuleEntry` for it to `BUILTIN`, under the path that places it in the tree

use std::path::Path;

use crate::commands::handle::CommandHandle;

pub mod keypair;
pub mod root;

/// Constructor of a module's command; `None` means the module exports no command
pub type Export = fn() -> Option<CommandHandle>;

/// A registered module: its virtual path and its command constructor
#[derive(Debug, Clone, Copy)]
pub struct ModuleEntry {
    pub path: &'static str,
    pub export: Export,
}

static BUILTIN: &[ModuleEntry] = &[
    ModuleEntry {
        path: "index",
        export: root::command,
    },
    ModuleEntry {
        path: "keypair/index",
        export: keypair::command,
    },
    ModuleEntry {
        path: "keypair/enum.cmd",
        export: keypair::enumerate::command,
    },
];

/// A set of modules compiled into the binary
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<ModuleEntry>,
}

impl Registry {
    /// Virtual root reported as the location of builtin modules
    pub const ROOT: &'static str = "<builtin>";

    /// The modules shipped with `lz-cli`
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    #[must_use]
    pub fn new(entries: Vec<ModuleEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        Path::new(Self::ROOT)
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ModuleEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }
}
