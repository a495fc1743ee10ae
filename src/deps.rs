//! Container runtime installation and baseline configuration.
//!
//! Idempotent: hosts that already have docker and a compose CLI skip the
//! package work entirely. The installation branch is selected from the
//! distribution family before any side effect, so unsupported hosts fail
//! clean with manual-install guidance.
use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use crate::compose;
use crate::distro::{Distro, Family};
use crate::exec;

pub const MANUAL_INSTALL_URL: &str = "https://docs.docker.com/engine/install/";

const DOCKER_PACKAGES: [&str; 5] = [
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

const DAEMON_CONFIG: &str = "/etc/docker/daemon.json";
const APT_KEYRING_DIR: &str = "/etc/apt/keyrings";
const APT_KEYRING: &str = "/etc/apt/keyrings/docker.asc";
const APT_SOURCE: &str = "/etc/apt/sources.list.d/docker.list";
const CENTOS_REPO: &str = "https://download.docker.com/linux/centos/docker-ce.repo";
const FEDORA_REPO: &str = "https://download.docker.com/linux/fedora/docker-ce.repo";

/// Hard privilege gate, checked before any side effect of the session.
pub fn check_privileges() -> Result<()> {
    // SAFETY: geteuid cannot fail and has no preconditions.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        bail!("stackup must run with elevated privileges; re-run with sudo");
    }
    Ok(())
}

/// Which package workflow a distribution family follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallRoute {
    /// Debian-like: apt sources + signing key keyed by the release channel.
    Apt { channel: &'static str },
    /// RHEL-like and Fedora: dnf/yum repo file.
    Dnf { repo_url: &'static str },
}

/// Map a family to its installation route. `Unknown` is a terminal error,
/// never a guess; resolved before any package-manager invocation.
pub fn install_route(family: Family) -> Result<InstallRoute> {
    match family {
        Family::Ubuntu => Ok(InstallRoute::Apt { channel: "ubuntu" }),
        Family::Debian => Ok(InstallRoute::Apt { channel: "debian" }),
        Family::Centos | Family::Rhel | Family::Rocky | Family::Almalinux => {
            Ok(InstallRoute::Dnf {
                repo_url: CENTOS_REPO,
            })
        }
        Family::Fedora => Ok(InstallRoute::Dnf {
            repo_url: FEDORA_REPO,
        }),
        Family::Unknown => bail!(
            "unsupported distribution family \"{family}\"; \
             install Docker manually ({MANUAL_INSTALL_URL}) and re-run"
        ),
    }
}

/// Ensure docker and a compose-capable CLI are installed, running, and
/// carry the baseline daemon configuration.
pub fn ensure_runtime_present(distro: &Distro) -> Result<()> {
    if runtime_present() {
        tracing::info!("docker and a compose CLI are already installed; skipping installation");
        start_runtime_service();
    } else {
        let route = install_route(distro.family)?;
        tracing::info!(
            family = %distro.family,
            version = %distro.version,
            "installing container runtime"
        );
        match route {
            InstallRoute::Apt { channel } => install_apt(distro, channel)?,
            InstallRoute::Dnf { repo_url } => install_dnf(repo_url)?,
        }
    }

    if apply_baseline_daemon_config()? {
        exec::run(&["systemctl", "restart", "docker"])
            .context("restart docker after writing baseline configuration")?;
    }
    ensure_docker_group_membership();
    Ok(())
}

fn runtime_present() -> bool {
    which::which("docker").is_ok() && compose::detect_cli().is_ok()
}

/// Best-effort start for an installed-but-stopped daemon; the readiness
/// gate is the real arbiter.
fn start_runtime_service() {
    if exec::succeeds(&["systemctl", "is-active", "--quiet", "docker"]) {
        return;
    }
    if let Err(err) = exec::run(&["systemctl", "enable", "--now", "docker"]) {
        tracing::warn!("could not start the docker service: {err:#}");
    }
}

fn install_apt(distro: &Distro, channel: &str) -> Result<()> {
    if distro.codename.is_empty() {
        bail!(
            "cannot determine the {channel} release codename; \
             install Docker manually ({MANUAL_INSTALL_URL}) and re-run"
        );
    }

    exec::run(&["apt-get", "update"])?;
    exec::run(&["apt-get", "install", "-y", "ca-certificates"])?;

    fs::create_dir_all(APT_KEYRING_DIR)
        .with_context(|| format!("create {APT_KEYRING_DIR}"))?;
    let key = fetch_signing_key(&format!(
        "https://download.docker.com/linux/{channel}/gpg"
    ))?;
    fs::write(APT_KEYRING, key).with_context(|| format!("write {APT_KEYRING}"))?;

    let arch = exec::capture(&["dpkg", "--print-architecture"])?;
    let source = format!(
        "deb [arch={} signed-by={APT_KEYRING}] https://download.docker.com/linux/{channel} {} stable\n",
        arch.trim(),
        distro.codename
    );
    fs::write(APT_SOURCE, source).with_context(|| format!("write {APT_SOURCE}"))?;

    exec::run(&["apt-get", "update"])?;
    let mut install = vec!["apt-get", "install", "-y"];
    install.extend_from_slice(&DOCKER_PACKAGES);
    exec::run(&install)?;

    exec::run(&["systemctl", "enable", "--now", "docker"])?;
    Ok(())
}

fn install_dnf(repo_url: &str) -> Result<()> {
    // Older RHEL-likes ship yum only; same sequence, different spellings.
    let dnf = which::which("dnf").is_ok();
    let pm = if dnf { "dnf" } else { "yum" };
    let plugins = if dnf { "dnf-plugins-core" } else { "yum-utils" };

    exec::run(&[pm, "-y", "install", plugins])?;
    if dnf {
        exec::run(&["dnf", "config-manager", "--add-repo", repo_url])?;
    } else {
        exec::run(&["yum-config-manager", "--add-repo", repo_url])?;
    }

    let mut install = vec![pm, "-y", "install"];
    install.extend_from_slice(&DOCKER_PACKAGES);
    exec::run(&install)?;

    exec::run(&["systemctl", "enable", "--now", "docker"])?;
    Ok(())
}

fn fetch_signing_key(url: &str) -> Result<String> {
    let mut response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch signing key from {url}"))?;
    let body = response
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read signing key from {url}"))?;
    Ok(body)
}

/// Write the baseline daemon configuration only when none exists yet; an
/// operator-customized file is never overwritten. Returns whether the file
/// was written (the caller restarts the service in that case).
pub fn apply_baseline_daemon_config() -> Result<bool> {
    apply_baseline_daemon_config_at(Path::new(DAEMON_CONFIG))
}

fn apply_baseline_daemon_config_at(path: &Path) -> Result<bool> {
    if path.exists() {
        tracing::debug!(
            path = %path.display(),
            "daemon configuration present; leaving it untouched"
        );
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let config = serde_json::json!({
        "log-driver": "json-file",
        "log-opts": { "max-size": "10m", "max-file": "3" },
    });
    let mut rendered =
        serde_json::to_string_pretty(&config).context("render daemon configuration")?;
    rendered.push('\n');
    fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote baseline daemon configuration");
    Ok(true)
}

/// Put the invoking operator into the docker group so post-install use does
/// not need sudo. Warning-only: group membership needs a fresh login anyway.
fn ensure_docker_group_membership() {
    let Ok(user) = env::var("SUDO_USER") else {
        return;
    };
    if user.is_empty() || user == "root" {
        return;
    }
    match exec::capture(&["usermod", "-aG", "docker", &user]) {
        Ok(_) => tracing::info!(
            "added {user} to the docker group; log out and back in for it to take effect"
        ),
        Err(err) => tracing::warn!("could not add {user} to the docker group: {err:#}"),
    }
}
