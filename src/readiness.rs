//! Bounded polling for slow-starting services.
//!
//! The gate knows nothing about what it is probing; callers hand it a
//! boolean check (docker daemon liveness, authenticated database ping) and
//! a log hint to surface on timeout. Elapsed time is measured on the
//! monotonic clock rather than by counting iterations, so slow probes do
//! not stretch the budget.
use anyhow::{bail, Result};
use std::thread;
use std::time::{Duration, Instant};

/// Default gap between probe attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Poll `probe` every `interval` until it succeeds or `timeout` elapses.
///
/// The probe runs immediately on entry, then once per interval. On timeout
/// the error names the service and tells the operator where to look
/// (`hint` is a log-inspection command such as `journalctl -u docker`).
pub fn wait_until_ready<F>(
    label: &str,
    mut probe: F,
    timeout: Duration,
    interval: Duration,
    hint: &str,
) -> Result<()>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if probe() {
            tracing::info!(
                attempts,
                elapsed_ms = start.elapsed().as_millis(),
                "{label} is ready"
            );
            return Ok(());
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            bail!(
                "{label} did not become ready within {}s; inspect its logs with `{hint}`",
                timeout.as_secs()
            );
        }
        // Never sleep past the deadline.
        let remaining = timeout - elapsed;
        thread::sleep(interval.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_on_nth_attempt_within_window() {
        let interval = Duration::from_millis(10);
        let n: u32 = 4;
        let mut calls: u32 = 0;
        let start = Instant::now();
        let result = wait_until_ready(
            "test service",
            || {
                calls += 1;
                calls >= n
            },
            Duration::from_secs(5),
            interval,
            "true",
        );
        let elapsed = start.elapsed();
        assert!(result.is_ok());
        assert_eq!(calls, n);
        // N-1 sleeps must have happened before the successful probe.
        assert!(elapsed >= interval * (n - 1));
    }

    #[test]
    fn first_attempt_success_is_immediate() {
        let start = Instant::now();
        let result = wait_until_ready(
            "test service",
            || true,
            Duration::from_secs(5),
            Duration::from_secs(5),
            "true",
        );
        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn never_ready_times_out_not_before_budget() {
        let timeout = Duration::from_millis(50);
        let start = Instant::now();
        let result = wait_until_ready(
            "stuck service",
            || false,
            timeout,
            Duration::from_millis(10),
            "journalctl -u stuck",
        );
        let elapsed = start.elapsed();
        let err = result.unwrap_err();
        assert!(elapsed >= timeout);
        assert!(err.to_string().contains("stuck service"));
        assert!(err.to_string().contains("journalctl -u stuck"));
    }
}
