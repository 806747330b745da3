use std::process::ExitCode;

use lz_cli::CliError;
use lz_cli::config::Settings;
use lz_cli::dispatch::DispatchError;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        // clap renders help, version and usage errors and picks the exit code itself
        Err(CliError::Dispatch(DispatchError::Parse(e))) => e.exit(),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<ExitCode, CliError> {
    let settings = Settings::from_env()?;
    lz_cli::logger::init(settings.log_file.as_deref())?;
    lz_cli::run(&settings, std::env::args_os()).await
}
