//! Compose stack discovery and uniform CLI dispatch.
//!
//! The context resolves the stack definition file once and hides which
//! compose implementation is installed (the `docker compose` plugin or the
//! legacy standalone `docker-compose`). It is read-only after discovery.
use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::exec;

/// Conventional stack definition filenames, in priority order.
pub const SEARCH_ORDER: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Which compose-capable CLI is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCli {
    /// `docker compose` (plugin, preferred)
    Plugin,
    /// standalone `docker-compose`
    Legacy,
}

/// Resolved stack context: definition file plus the CLI that addresses it.
#[derive(Debug, Clone)]
pub struct ComposeCtx {
    pub file: PathBuf,
    pub cli: ComposeCli,
}

impl ComposeCtx {
    /// Locate the stack definition and a compose-capable CLI. Either one
    /// missing is fatal; we never guess a file.
    pub fn discover(override_path: Option<&Path>) -> Result<ComposeCtx> {
        let cwd = env::current_dir().context("determine working directory")?;
        let file = discover_file(&cwd, override_path)?;
        let cli = detect_cli()?;
        tracing::info!(
            file = %file.display(),
            cli = ?cli,
            "compose context ready"
        );
        Ok(ComposeCtx { file, cli })
    }

    /// Build the full argv for a compose subcommand against this stack.
    pub fn argv(&self, args: &[&str]) -> Vec<String> {
        let file = self.file.display().to_string();
        let mut argv: Vec<String> = match self.cli {
            ComposeCli::Plugin => vec!["docker".into(), "compose".into()],
            ComposeCli::Legacy => vec!["docker-compose".into()],
        };
        argv.push("-f".into());
        argv.push(file);
        argv.extend(args.iter().map(|a| a.to_string()));
        argv
    }

    /// Run a compose subcommand with output streamed to the terminal.
    pub fn run(&self, args: &[&str]) -> Result<()> {
        let argv = self.argv(args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        exec::run(&argv)
    }

    /// Run a compose subcommand capturing stdout.
    pub fn capture(&self, args: &[&str]) -> Result<String> {
        let argv = self.argv(args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        exec::capture(&argv)
    }

    /// Whether `name` is a service defined by the discovered stack. Used to
    /// decide between service addressing (`compose exec`) and raw container
    /// addressing (`docker exec`).
    pub fn service_exists(&self, name: &str) -> bool {
        match self.capture(&["config", "--services"]) {
            Ok(listing) => listing.lines().any(|line| line.trim() == name),
            Err(err) => {
                tracing::warn!("could not list stack services: {err:#}");
                false
            }
        }
    }
}

/// Probe for a compose-capable CLI: the docker plugin first, then the
/// legacy standalone binary.
pub fn detect_cli() -> Result<ComposeCli> {
    if exec::succeeds(&["docker", "compose", "version"]) {
        return Ok(ComposeCli::Plugin);
    }
    if which::which("docker-compose").is_ok() {
        return Ok(ComposeCli::Legacy);
    }
    bail!(
        "no compose-capable CLI found; install the docker compose plugin or docker-compose"
    )
}

fn discover_file(dir: &Path, override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        bail!("stack definition {} does not exist", path.display());
    }
    for name in SEARCH_ORDER {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    bail!(
        "no stack definition found in {} (looked for {}); \
         run from the deployment directory or pass --compose-file",
        dir.display(),
        SEARCH_ORDER.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discover_prefers_earlier_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("compose.yaml"), "services: {}\n").unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let found = discover_file(dir.path(), None).unwrap();
        assert_eq!(found, dir.path().join("docker-compose.yml"));
    }

    #[test]
    fn discover_override_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let custom = dir.path().join("stack.prod.yml");
        fs::write(&custom, "services: {}\n").unwrap();
        let found = discover_file(dir.path(), Some(&custom)).unwrap();
        assert_eq!(found, custom);
    }

    #[test]
    fn discover_missing_override_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(discover_file(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn discover_empty_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = discover_file(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("no stack definition"));
    }

    #[test]
    fn argv_for_both_cli_forms() {
        let ctx = ComposeCtx {
            file: PathBuf::from("docker-compose.yml"),
            cli: ComposeCli::Plugin,
        };
        assert_eq!(
            ctx.argv(&["up", "-d"]),
            vec!["docker", "compose", "-f", "docker-compose.yml", "up", "-d"]
        );

        let ctx = ComposeCtx {
            file: PathBuf::from("stack.yml"),
            cli: ComposeCli::Legacy,
        };
        assert_eq!(
            ctx.argv(&["restart", "bot"]),
            vec!["docker-compose", "-f", "stack.yml", "restart", "bot"]
        );
    }
}
