//! Synchronous external command execution.
//!
//! Every call checks the exit status at the call site; nothing here
//! retries. `run` streams output to the operator's terminal (package
//! managers, compose), `capture`/`succeeds` are for quiet queries, and
//! `run_with_input` pipes a byte stream into the child's stdin.
use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::time::Instant;

fn command_from(argv: &[&str]) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("missing command"))?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

/// Run a command with inherited stdio, failing on a non-zero exit.
pub fn run(argv: &[&str]) -> Result<()> {
    let rendered = argv.join(" ");
    tracing::debug!(command = %rendered, "run");
    let start = Instant::now();
    let status = command_from(argv)?
        .status()
        .with_context(|| format!("spawn `{rendered}`"))?;
    tracing::debug!(
        command = %rendered,
        elapsed_ms = start.elapsed().as_millis(),
        code = status.code(),
        "run complete"
    );
    if !status.success() {
        bail!("`{rendered}` failed with status {status}");
    }
    Ok(())
}

/// Run a command capturing stdout; non-zero exit is an error carrying the
/// trimmed stderr.
pub fn capture(argv: &[&str]) -> Result<String> {
    let rendered = argv.join(" ");
    let output = command_from(argv)?
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawn `{rendered}`"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{rendered}` failed with status {}: {}",
            output.status,
            stderr.trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Status-only probe: true when the command exits zero. All output is
/// discarded, spawn failures count as "not ready".
pub fn succeeds(argv: &[&str]) -> bool {
    let Ok(mut command) = command_from(argv) else {
        return false;
    };
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a command with `input` piped to its stdin, capturing output.
/// The caller classifies the exit status.
pub fn run_with_input(argv: &[&str], input: &[u8]) -> Result<Output> {
    let rendered = argv.join(" ");
    let start = Instant::now();
    let mut child = command_from(argv)?
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn `{rendered}`"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .with_context(|| format!("write stdin of `{rendered}`"))?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("wait for `{rendered}`"))?;
    tracing::debug!(
        command = %rendered,
        input_bytes = input.len(),
        elapsed_ms = start.elapsed().as_millis(),
        code = output.status.code(),
        "piped run complete"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_is_rejected() {
        assert!(run(&[]).is_err());
        assert!(capture(&[]).is_err());
        assert!(!succeeds(&[]));
    }

    #[test]
    fn succeeds_reflects_exit_status() {
        assert!(succeeds(&["true"]));
        assert!(!succeeds(&["false"]));
        assert!(!succeeds(&["definitely-not-a-command-xyz"]));
    }

    #[test]
    fn capture_returns_stdout() {
        let out = capture(&["echo", "hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn capture_failure_carries_status() {
        let err = capture(&["false"]).unwrap_err();
        assert!(err.to_string().contains("`false` failed"));
    }

    #[test]
    fn run_with_input_pipes_stdin() {
        let output = run_with_input(&["cat"], b"seed data").unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"seed data");
    }
}
