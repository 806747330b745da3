use crate::commands::handle::CommandHandle;

/// Name of the root command
pub const NAME: &str = "lz-cli";

#[allow(clippy::unnecessary_wraps)]
#[must_use]
pub fn command() -> Option<CommandHandle> {
    Some(CommandHandle::new(
        clap::Command::new(NAME)
            .version(env!("CARGO_PKG_VERSION"))
            .about("layerzero cli"),
    ))
}
