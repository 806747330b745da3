//! Core implementation of lz-cli
//!
//! lz-cli is a command-line toolkit whose command tree is assembled at startup from
//! independently authored modules. A module only declares its own command; where it ends up in
//! the tree follows from its path. Group modules (`index`) stand for their directory, leaf
//! modules for themselves. Modules come from the builtin registry and, optionally, from a
//! directory of YAML command manifests.
//!
//! Assembly runs in two passes, groups first and then leaves, so every leaf finds its parent
//! group in place. Structural problems such as a module without a command or two siblings
//! answering to the same name abort startup before any argument is parsed.

use thiserror::Error;

pub mod commands;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod loader;
pub mod logger;
pub mod manifest;
pub mod modules;
pub mod tree;

pub use dispatch::{assemble, run};

/// Any error that can stop lz-cli
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Logger(#[from] logger::LoggerError),
    #[error(transparent)]
    Discovery(#[from] discovery::DiscoveryError),
    #[error(transparent)]
    Load(#[from] loader::LoadError),
    #[error(transparent)]
    Assembly(#[from] tree::AssemblyError),
    #[error(transparent)]
    Dispatch(#[from] dispatch::DispatchError),
}
