use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod compose;
mod deps;
mod distro;
mod envfile;
mod exec;
mod import;
mod lockfile;
mod prompt;
mod readiness;
mod session;
mod status;

use cli::{Command, InstallArgs, RootArgs};
use session::Outcome;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("STACKUP_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match run(args) {
        // Operator declines are a clean exit, not a failure.
        Ok(Outcome::Completed) | Ok(Outcome::Cancelled) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RootArgs) -> Result<Outcome> {
    match args.command {
        // Bare `stackup` behaves like interactive install.
        None => session::run_session(&InstallArgs::default()),
        Some(Command::Install(install)) => session::run_session(&install),
        Some(Command::Status(status_args)) => {
            status::run_status(&status_args)?;
            Ok(Outcome::Completed)
        }
    }
}
