//! Read-only state report: host, runtime, stack, and policy flag.
use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::StatusArgs;
use crate::compose::{self, ComposeCli, ComposeCtx};
use crate::distro::Distro;
use crate::envfile::{self, PolicyFlag};
use crate::exec;
use crate::session::POLICY_KEY;

#[derive(Serialize)]
struct StatusReport {
    distro_family: String,
    distro_version: String,
    docker_version: Option<String>,
    compose_cli: Option<String>,
    compose_file: Option<String>,
    database_policy: String,
    running_containers: Vec<String>,
}

/// Gather and print the report. Everything here is best-effort probing;
/// missing pieces render as absent rather than failing the command.
pub fn run_status(args: &StatusArgs) -> Result<()> {
    let distro = Distro::detect();

    let docker_version = exec::capture(&["docker", "--version"])
        .ok()
        .map(|v| v.trim().to_string());

    let compose_cli = compose::detect_cli().ok().map(|cli| {
        match cli {
            ComposeCli::Plugin => "docker compose",
            ComposeCli::Legacy => "docker-compose",
        }
        .to_string()
    });

    let compose_file = ComposeCtx::discover(args.compose_file.as_deref())
        .ok()
        .map(|ctx| ctx.file.display().to_string());

    let database_policy = match envfile::policy_flag(&args.env_file, POLICY_KEY) {
        PolicyFlag::Enabled => "enabled",
        PolicyFlag::Disabled => "disabled",
        PolicyFlag::Unset => "unset",
    }
    .to_string();

    let running_containers = exec::capture(&["docker", "ps", "--format", "{{.Names}}"])
        .map(|names| {
            names
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let report = StatusReport {
        distro_family: distro.family.to_string(),
        distro_version: distro.version,
        docker_version,
        compose_cli,
        compose_file,
        database_policy,
        running_containers,
    };

    if args.json {
        let rendered = serde_json::to_string_pretty(&report).context("render status report")?;
        println!("{rendered}");
    } else {
        print_human(&report);
    }
    Ok(())
}

fn print_human(report: &StatusReport) {
    let absent = "not found".to_string();
    println!("host:        {} {}", report.distro_family, report.distro_version);
    println!(
        "docker:      {}",
        report.docker_version.as_ref().unwrap_or(&absent)
    );
    println!(
        "compose cli: {}",
        report.compose_cli.as_ref().unwrap_or(&absent)
    );
    println!(
        "stack file:  {}",
        report.compose_file.as_ref().unwrap_or(&absent)
    );
    println!("database:    {}", report.database_policy);
    if report.running_containers.is_empty() {
        println!("running:     none");
    } else {
        println!("running:     {}", report.running_containers.join(", "));
    }
}
