//! CLI argument parsing for the provisioning workflow.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::import::DEFAULT_SEED_FILE;
use crate::lockfile::DEFAULT_LOCK_PATH;

/// Root CLI entrypoint. Running without a subcommand starts the
/// interactive install flow with its numbered menu.
#[derive(Parser, Debug)]
#[command(
    name = "stackup",
    version,
    about = "One-shot Docker Compose stack provisioner with optional database seeding",
    after_help = "Examples:\n  sudo stackup                      # interactive menu\n  sudo stackup install --assume-yes # unattended bring-up\n  sudo stackup status --json        # machine-readable state"
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the stack up, installing the container runtime if needed
    Install(InstallArgs),
    /// Report host, runtime, and stack state without changing anything
    Status(StatusArgs),
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Provision the container runtime and bring the stack up")]
pub struct InstallArgs {
    /// Environment file holding the policy flag and database credentials
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Stack definition file (overrides the conventional-name search)
    #[arg(long, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// Compose project name (defaults to the working directory name)
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Seed-data artifact imported into the database on first enable
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SEED_FILE)]
    pub seed_file: PathBuf,

    /// Answer yes to every confirmation and skip the menu prompts
    #[arg(long, short = 'y')]
    pub assume_yes: bool,

    /// Skip the interactive menu and go straight to installation
    #[arg(long)]
    pub no_menu: bool,

    /// Advisory lock preventing concurrent runs on this host
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LOCK_PATH)]
    pub lock_file: PathBuf,
}

impl Default for InstallArgs {
    fn default() -> Self {
        InstallArgs {
            env_file: PathBuf::from(".env"),
            compose_file: None,
            project: None,
            seed_file: PathBuf::from(DEFAULT_SEED_FILE),
            assume_yes: false,
            no_menu: false,
            lock_file: PathBuf::from(DEFAULT_LOCK_PATH),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Report host, runtime, and stack state")]
pub struct StatusArgs {
    /// Environment file holding the policy flag
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Stack definition file (overrides the conventional-name search)
    #[arg(long, value_name = "PATH")]
    pub compose_file: Option<PathBuf>,

    /// Compose project name (defaults to the working directory name)
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_is_accepted() {
        let args = RootArgs::try_parse_from(["stackup"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn install_flags_parse() {
        let args = RootArgs::try_parse_from([
            "stackup",
            "install",
            "--compose-file",
            "stack.prod.yml",
            "--assume-yes",
            "--no-menu",
        ])
        .unwrap();
        let Some(Command::Install(install)) = args.command else {
            panic!("expected install subcommand");
        };
        assert_eq!(
            install.compose_file.as_deref(),
            Some(std::path::Path::new("stack.prod.yml"))
        );
        assert!(install.assume_yes);
        assert!(install.no_menu);
        assert_eq!(install.env_file, PathBuf::from(".env"));
        assert_eq!(install.seed_file, PathBuf::from(DEFAULT_SEED_FILE));
    }

    #[test]
    fn defaults_match_the_interactive_path() {
        let parsed = RootArgs::try_parse_from(["stackup", "install"]).unwrap();
        let Some(Command::Install(parsed)) = parsed.command else {
            panic!("expected install subcommand");
        };
        let defaulted = InstallArgs::default();
        assert_eq!(parsed.env_file, defaulted.env_file);
        assert_eq!(parsed.seed_file, defaulted.seed_file);
        assert_eq!(parsed.lock_file, defaulted.lock_file);
        assert_eq!(parsed.assume_yes, defaulted.assume_yes);
    }
}
