//! Command handles and the behaviour attached to them
//!
//! A [`handle::CommandHandle`] is the unit every module exports: a `clap` command definition
//! without subcommands, plus an optional [`handle::Action`] that runs when the command is the
//! deepest one matched on the command line. Handles never know about their parents or children;
//! the tree builder composes them.

pub mod handle;
pub mod shell;
