//! Cross-run mutual exclusion.
//!
//! A single advisory file lock held for the process lifetime. A second
//! installer invocation on the same host must fail immediately rather
//! than block; the holder's PID is written into the file so the error
//! can name it.
use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Default lock location; requires the privileges the session demands anyway.
pub const DEFAULT_LOCK_PATH: &str = "/var/lock/stackup.lock";

/// Held advisory lock. Released (and best-effort removed) on drop.
#[derive(Debug)]
pub struct Lock {
    file: std::fs::File,
    path: PathBuf,
}

impl Lock {
    /// Acquire the lock or fail immediately on contention.
    pub fn acquire(path: &Path) -> Result<Lock> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create lock directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("open lock file {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                let holder = fs::read_to_string(path).unwrap_or_default();
                let holder = holder.trim();
                if holder.is_empty() {
                    bail!(
                        "another stackup run holds the lock at {}; wait for it to finish",
                        path.display()
                    );
                }
                bail!(
                    "another stackup run (pid {holder}) holds the lock at {}; wait for it to finish",
                    path.display()
                );
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("lock {}", path.display()));
            }
        }
        file.set_len(0)
            .with_context(|| format!("truncate lock file {}", path.display()))?;
        writeln!(file, "{}", std::process::id())
            .with_context(|| format!("record pid in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "lock acquired");
        Ok(Lock {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}
