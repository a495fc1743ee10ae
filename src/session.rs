//! Top-level provisioning sequence.
//!
//! Strictly sequential: privilege gate, cross-run lock, repository sync,
//! menu, re-run pre-check, runtime installation, daemon readiness, stack
//! activation, then the database policy branch. User declines terminate
//! with success and no further side effects.
use anyhow::{Context, Result};
use regex::Regex;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::cli::InstallArgs;
use crate::compose::{ComposeCli, ComposeCtx};
use crate::deps;
use crate::distro::Distro;
use crate::envfile::{self, PolicyFlag};
use crate::exec;
use crate::import::{self, ImportOpts};
use crate::lockfile::Lock;
use crate::prompt::{self, MenuChoice};
use crate::readiness;

/// Persisted policy key controlling database integration.
pub const POLICY_KEY: &str = "USE_DB";

/// Stack service that consumes the policy flag and gets the scoped restart.
pub const APP_SERVICE: &str = "bot";

const DAEMON_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// How the session ended. Cancellation is a success exit, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// What the policy branch decided. Derived purely from the current flag
/// and the operator's answer (when one was asked for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyAction {
    /// Run the import workflow.
    pub import: bool,
    /// Persist this value to the policy key before importing.
    pub persist: Option<bool>,
    /// Scoped restart so the application picks up the freshly-enabled flag.
    /// Fires on the disabled/unset -> enabled transition only, independent
    /// of the import outcome.
    pub restart: bool,
}

pub fn policy_action(flag: PolicyFlag, answer: Option<bool>) -> PolicyAction {
    match (flag, answer) {
        // Already enabled: import silently, no transition, no restart.
        (PolicyFlag::Enabled, _) => PolicyAction {
            import: true,
            persist: None,
            restart: false,
        },
        (PolicyFlag::Disabled, Some(true)) | (PolicyFlag::Unset, Some(true)) => PolicyAction {
            import: true,
            persist: Some(true),
            restart: true,
        },
        // Explicit decline on first run is recorded so the next run skips
        // the question; a decline while disabled changes nothing.
        (PolicyFlag::Unset, Some(false)) => PolicyAction {
            import: false,
            persist: Some(false),
            restart: false,
        },
        (PolicyFlag::Disabled, Some(false))
        | (PolicyFlag::Disabled, None)
        | (PolicyFlag::Unset, None) => PolicyAction {
            import: false,
            persist: None,
            restart: false,
        },
    }
}

/// Run the full session.
pub fn run_session(args: &InstallArgs) -> Result<Outcome> {
    deps::check_privileges()?;
    let _lock = Lock::acquire(&args.lock_file)?;

    sync_repository();

    if !args.no_menu {
        match prompt::menu(args.assume_yes)? {
            MenuChoice::Install => {}
            MenuChoice::Exit => {
                tracing::info!("exiting at operator request; nothing was changed");
                return Ok(Outcome::Cancelled);
            }
        }
    }

    let project = project_name(args)?;
    if stack_already_running(&project)? {
        let question = format!(
            "Containers for project '{project}' are already running. \
             Continue and reapply the stack?"
        );
        if !prompt::confirm(&question, false, args.assume_yes)? {
            tracing::info!("cancelled; the running stack was left untouched");
            return Ok(Outcome::Cancelled);
        }
    }

    let distro = Distro::detect();
    tracing::info!(
        family = %distro.family,
        version = %distro.version,
        codename = %distro.codename,
        "detected host distribution"
    );

    deps::ensure_runtime_present(&distro)?;

    readiness::wait_until_ready(
        "docker daemon",
        || exec::succeeds(&["docker", "info"]),
        DAEMON_READY_TIMEOUT,
        readiness::DEFAULT_INTERVAL,
        "journalctl -u docker",
    )?;

    let ctx = ComposeCtx::discover(args.compose_file.as_deref())?;
    ctx.run(&["up", "-d"]).context("bring the stack up")?;

    let env_file = args.env_file.as_path();
    let flag = envfile::policy_flag(env_file, POLICY_KEY);
    let answer = match flag {
        PolicyFlag::Enabled => None,
        PolicyFlag::Disabled => Some(prompt::confirm(
            "Database integration is currently disabled. Enable it?",
            false,
            args.assume_yes,
        )?),
        PolicyFlag::Unset => Some(prompt::confirm(
            "Enable database integration for the application?",
            true,
            args.assume_yes,
        )?),
    };
    let action = policy_action(flag, answer);

    if let Some(value) = action.persist {
        envfile::set(env_file, POLICY_KEY, if value { "true" } else { "false" })
            .context("persist the database policy flag")?;
        tracing::info!(value, "persisted {POLICY_KEY}");
    }

    if action.import {
        let opts = ImportOpts {
            seed_path: args.seed_file.clone(),
            assume_yes: args.assume_yes,
            timeout: import::DB_READY_TIMEOUT,
        };
        // Missing credential aborts here; an import that ran and failed
        // does not, and the restart below still happens.
        let outcome = import::run_import(&ctx, env_file, &opts)?;
        tracing::info!(?outcome, "database import workflow finished");
    }

    if action.restart {
        restart_application(&ctx);
    }

    print_hints(&ctx);
    Ok(Outcome::Completed)
}

/// Best-effort `git pull` so a re-run picks up deployment updates. A
/// missing checkout, offline remote, or diverged history only logs.
fn sync_repository() {
    if !Path::new(".git").is_dir() {
        tracing::debug!("not a git checkout; skipping repository sync");
        return;
    }
    match exec::run(&["git", "pull", "--ff-only"]) {
        Ok(()) => tracing::info!("deployment repository synced"),
        Err(err) => {
            tracing::warn!("repository sync failed: {err:#}; continuing with the checked-out tree");
        }
    }
}

fn project_name(args: &InstallArgs) -> Result<String> {
    if let Some(project) = &args.project {
        return Ok(project.clone());
    }
    let cwd = env::current_dir().context("determine working directory")?;
    let name = cwd
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    Ok(name)
}

/// Compose names containers `<project>-<service>-<n>` (or with underscores
/// in older releases); any match means a previous run is still up.
fn stack_already_running(project: &str) -> Result<bool> {
    if project.is_empty() || which::which("docker").is_err() {
        return Ok(false);
    }
    let names = match exec::capture(&["docker", "ps", "--format", "{{.Names}}"]) {
        Ok(names) => names,
        Err(err) => {
            // Daemon not up yet; treated as a first run.
            tracing::debug!("could not list running containers: {err:#}");
            return Ok(false);
        }
    };
    matches_project(&names, project)
}

fn matches_project(names: &str, project: &str) -> Result<bool> {
    let pattern = Regex::new(&format!("^{}[-_]", regex::escape(project)))
        .context("build project name pattern")?;
    Ok(names.lines().any(|line| pattern.is_match(line.trim())))
}

/// Scoped restart so the application re-reads its environment. Falls back
/// to a full stack restart when the conventional service name is absent.
/// Best-effort by design: the stack is already up.
fn restart_application(ctx: &ComposeCtx) {
    let result = if ctx.service_exists(APP_SERVICE) {
        ctx.run(&["restart", APP_SERVICE])
    } else {
        tracing::debug!("no '{APP_SERVICE}' service; restarting the whole stack");
        ctx.run(&["restart"])
    };
    if let Err(err) = result {
        tracing::warn!("restart failed: {err:#}");
    }
}

fn print_hints(ctx: &ComposeCtx) {
    let base = match ctx.cli {
        ComposeCli::Plugin => "docker compose",
        ComposeCli::Legacy => "docker-compose",
    };
    let file = ctx.file.display();
    println!();
    println!("Stack is up. Useful commands:");
    println!("  {base} -f {file} ps          # service status");
    println!("  {base} -f {file} logs -f     # follow logs");
    println!("  {base} -f {file} down        # stop the stack");
}
