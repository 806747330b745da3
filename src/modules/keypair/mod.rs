//! Keypair utilities

use crate::commands::handle::CommandHandle;

pub mod enumerate;

#[allow(clippy::unnecessary_wraps)]
#[must_use]
pub fn command() -> Option<CommandHandle> {
    Some(CommandHandle::new(
        clap::Command::new("keypair").about("Inspect keypairs derived from a mnemonic"),
    ))
}
