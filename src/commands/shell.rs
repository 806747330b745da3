//! Action that runs a shell command line, used by manifest-defined leaf commands

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, ExitCode};

use anstyle::{AnsiColor, Reset, Style};
use log::debug;

use crate::commands::handle::{Action, ActionResult, Invocation};

/// Id of the positional argument that collects everything after the command name
pub const FORWARDED_ARGS: &str = "args";

const PRIMARY_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Cyan)));
const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));

#[must_use]
pub fn format_start_message(command: &str, color: bool) -> String {
    if color {
        format!("{PRIMARY_COLOR}❱{Reset} {command}")
    } else {
        format!("❱ {command}")
    }
}

#[must_use]
pub fn format_failure_message(exit_code: i32, color: bool) -> String {
    if color {
        format!("{ERROR_COLOR}✘{Reset} Command failed with exit code {exit_code}")
    } else {
        format!("✘ Command failed with exit code {exit_code}")
    }
}

/// Maps a process exit status code onto the CLI's own exit code
#[must_use]
pub fn exit_code_from(code: Option<i32>) -> ExitCode {
    match code {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1).max(1)),
        None => ExitCode::FAILURE,
    }
}

/// Runs `sh -c <cmd> <name> [args...]`, inheriting stdio
#[derive(Debug, Clone)]
pub struct ShellAction {
    pub name: String,
    pub cmd: String,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

impl Action for ShellAction {
    fn run(&self, invocation: &Invocation<'_>) -> ActionResult {
        let forwarded: Vec<&String> = invocation
            .matches
            .try_get_many::<String>(FORWARDED_ARGS)
            .ok()
            .flatten()
            .map(Iterator::collect)
            .unwrap_or_default();
        let color = std::io::stderr().is_terminal();

        debug!(
            "Running `{}` for {} in {}",
            self.cmd,
            invocation.command,
            self.cwd.display()
        );
        eprintln!("{}", format_start_message(&self.cmd, color));

        let status = ProcessCommand::new("sh")
            .arg("-c")
            .arg(&self.cmd)
            .arg(&self.name)
            .args(forwarded)
            .current_dir(&self.cwd)
            .envs(&self.env)
            .status()?;

        if !status.success()
            && let Some(code) = status.code()
        {
            eprintln!("{}", format_failure_message(code, color));
        }
        Ok(exit_code_from(status.code()))
    }
}
