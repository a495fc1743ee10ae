//! Readiness-gated, idempotent database seeding.
//!
//! The seed artifact is streamed into an authenticated client session in
//! the running database container. A sentinel principal (the application's
//! own database account) stands in for "already initialized": when present,
//! re-import requires explicit confirmation since replaying the seed risks
//! duplicate-key failures. A failed import is reported, never rolled back,
//! and does not abort the surrounding session.
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compose::ComposeCtx;
use crate::envfile;
use crate::exec;
use crate::prompt;
use crate::readiness;

/// Conventional seed artifact name next to the stack definition.
pub const DEFAULT_SEED_FILE: &str = "database.sql";

/// Conventional database service name when `DB_HOST` is unset.
pub const DEFAULT_DB_SERVICE: &str = "db";

/// How long the database gets to come up inside its container.
pub const DB_READY_TIMEOUT: Duration = Duration::from_secs(180);

/// Operator override for the in-container database client command.
const DB_CLIENT_VAR: &str = "STACKUP_DB_CLIENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported,
    /// Seed artifact absent; nothing to import.
    SkippedNoSeed,
    /// Sentinel principal present and re-import declined.
    SkippedAlreadyInitialized,
    /// Import ran and failed; reported, session continues.
    Failed,
}

pub struct ImportOpts {
    pub seed_path: PathBuf,
    pub assume_yes: bool,
    pub timeout: Duration,
}

/// How the import addresses the database: a stack-managed service or a
/// directly-named container.
enum ExecTarget {
    Service(String),
    Container(String),
}

impl ExecTarget {
    fn argv(&self, ctx: &ComposeCtx, command: &[&str]) -> Vec<String> {
        match self {
            ExecTarget::Service(name) => {
                let mut args = vec!["exec", "-T", name.as_str()];
                args.extend_from_slice(command);
                ctx.argv(&args)
            }
            ExecTarget::Container(name) => {
                let mut argv = vec!["docker".to_string(), "exec".to_string(), "-i".to_string()];
                argv.push(name.clone());
                argv.extend(command.iter().map(|a| a.to_string()));
                argv
            }
        }
    }

    fn log_hint(&self, ctx: &ComposeCtx) -> String {
        match self {
            ExecTarget::Service(name) => ctx.argv(&["logs", name.as_str()]).join(" "),
            ExecTarget::Container(name) => format!("docker logs {name}"),
        }
    }
}

/// Pure step decision, split out so the idempotency rules are testable
/// without a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportDecision {
    SkipNoSeed,
    Proceed,
    NeedsConfirmation,
}

pub(crate) fn decide(seed_present: bool, principal_exists: bool) -> ImportDecision {
    if !seed_present {
        ImportDecision::SkipNoSeed
    } else if principal_exists {
        ImportDecision::NeedsConfirmation
    } else {
        ImportDecision::Proceed
    }
}

/// Run the import workflow end to end.
///
/// A missing root credential is fatal; a missing seed artifact or a
/// declined re-import is an informational skip; an import that executes
/// and fails yields `ImportOutcome::Failed` so the session can continue.
pub fn run_import(ctx: &ComposeCtx, env_file: &Path, opts: &ImportOpts) -> Result<ImportOutcome> {
    let root_password = envfile::get(env_file, "MYSQL_ROOT_PASSWORD");
    if root_password.is_empty() {
        bail!(
            "MYSQL_ROOT_PASSWORD is not set in {}; the database cannot be seeded without it",
            env_file.display()
        );
    }

    // Seed check comes before any contact with the stack.
    if !opts.seed_path.is_file() {
        tracing::warn!(
            seed = %opts.seed_path.display(),
            "seed artifact not found; nothing to import"
        );
        return Ok(ImportOutcome::SkippedNoSeed);
    }

    let host = {
        let configured = envfile::get(env_file, "DB_HOST");
        if configured.is_empty() {
            DEFAULT_DB_SERVICE.to_string()
        } else {
            configured
        }
    };
    let target = if ctx.service_exists(&host) {
        tracing::debug!(service = %host, "import target is a stack service");
        ExecTarget::Service(host.clone())
    } else {
        tracing::debug!(container = %host, "import target is a container name");
        ExecTarget::Container(host.clone())
    };

    let client = db_client();
    let password_arg = format!("-p{root_password}");

    let ping = with_client(&client, &["-uroot", &password_arg, "-e", "SELECT 1"]);
    let ping_argv = target.argv(ctx, &as_strs(&ping));
    readiness::wait_until_ready(
        "database",
        || exec::succeeds(&as_strs(&ping_argv)),
        opts.timeout,
        readiness::DEFAULT_INTERVAL,
        &target.log_hint(ctx),
    )?;

    let app_user = envfile::get(env_file, "DB_USER");
    let principal_exists = if app_user.is_empty() {
        tracing::debug!("DB_USER unset; skipping the duplicate-import check");
        false
    } else {
        sentinel_exists(ctx, &target, &client, &password_arg, &app_user)
    };

    match decide(true, principal_exists) {
        ImportDecision::SkipNoSeed => unreachable!("seed presence checked above"),
        ImportDecision::Proceed => {}
        ImportDecision::NeedsConfirmation => {
            let question = format!(
                "Database principal '{app_user}' already exists (prior import?). \
                 Re-importing may fail on duplicate keys. Re-import anyway?"
            );
            if !prompt::confirm(&question, false, opts.assume_yes)? {
                tracing::info!("keeping the existing database; import skipped");
                return Ok(ImportOutcome::SkippedAlreadyInitialized);
            }
        }
    }

    let seed = fs::read(&opts.seed_path)
        .with_context(|| format!("read seed artifact {}", opts.seed_path.display()))?;
    tracing::info!(
        seed = %opts.seed_path.display(),
        bytes = seed.len(),
        "importing seed data"
    );

    let session = with_client(&client, &["-uroot", &password_arg]);
    let session_argv = target.argv(ctx, &as_strs(&session));
    let output = exec::run_with_input(&as_strs(&session_argv), &seed)?;
    if output.status.success() {
        tracing::info!("seed data imported");
        Ok(ImportOutcome::Imported)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(
            code = output.status.code(),
            "database import failed: {}; continuing without seeded data",
            stderr.trim()
        );
        Ok(ImportOutcome::Failed)
    }
}

/// Does the application's database account already exist? Query failures
/// are warned about and treated as "not initialized" so a flaky check does
/// not block a first import.
fn sentinel_exists(
    ctx: &ComposeCtx,
    target: &ExecTarget,
    client: &[String],
    password_arg: &str,
    app_user: &str,
) -> bool {
    let quoted = app_user.replace('\'', "''");
    let query = format!("SELECT COUNT(*) FROM mysql.user WHERE user = '{quoted}'");
    let check = with_client(client, &["-uroot", password_arg, "-N", "-B", "-e", &query]);
    let argv = target.argv(ctx, &as_strs(&check));
    match exec::capture(&as_strs(&argv)) {
        Ok(out) => {
            let count: u64 = out.trim().lines().last().and_then(|line| line.trim().parse().ok()).unwrap_or(0);
            count > 0
        }
        Err(err) => {
            tracing::warn!("duplicate-import check failed: {err:#}");
            false
        }
    }
}

/// The in-container client command, overridable via `STACKUP_DB_CLIENT`
/// (e.g. `mariadb`). Falls back to `mysql` on a malformed override.
fn db_client() -> Vec<String> {
    let Ok(raw) = std::env::var(DB_CLIENT_VAR) else {
        return vec!["mysql".to_string()];
    };
    match shell_words::split(&raw) {
        Ok(parts) if !parts.is_empty() => parts,
        Ok(_) => vec!["mysql".to_string()],
        Err(err) => {
            tracing::warn!("ignoring malformed {DB_CLIENT_VAR}: {err}");
            vec!["mysql".to_string()]
        }
    }
}

fn with_client(client: &[String], args: &[&str]) -> Vec<String> {
    let mut argv = client.to_vec();
    argv.extend(args.iter().map(|a| a.to_string()));
    argv
}

fn as_strs(argv: &[String]) -> Vec<&str> {
    argv.iter().map(String::as_str).collect()
}
