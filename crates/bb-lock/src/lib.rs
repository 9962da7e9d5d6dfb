//! Generic advisory file lock using `flock(2)` directly.
//!
//! Uses raw `libc::flock` instead of an RAII wrapper around a borrowed file
//! to avoid the self-referential struct problem: the guard only needs to own
//! the `File` (which owns the fd). `Drop` calls `flock(fd, LOCK_UN)` to
//! release.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct LockDiagnostic {
    pid: u32,
    owner: String,
    acquired_at: DateTime<Utc>,
    reason: String,
}

/// Advisory lock guard backed by `flock(2)`.
pub struct FileLock {
    file: File,
    lock_path: PathBuf,
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` is a valid file descriptor owned by `self.file`.
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}

impl FileLock {
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

/// Acquire a non-blocking exclusive lock at `lock_path`, creating parent
/// directories as needed. On success, writes a diagnostic JSON payload
/// (pid, owner, acquired_at, reason) into the lock file so a blocked caller
/// can report who holds it.
pub fn acquire_lock(lock_path: &Path, owner: &str, reason: &str) -> Result<FileLock> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create lock directory: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_context(|| format!("failed to open lock file: {}", lock_path.display()))?;

    let fd = file.as_raw_fd();

    // SAFETY: `fd` is a valid file descriptor from the `File` we just opened.
    let ret = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };

    if ret == 0 {
        let mut lock = FileLock {
            file,
            lock_path: lock_path.to_path_buf(),
        };

        let diagnostic = LockDiagnostic {
            pid: std::process::id(),
            owner: owner.to_string(),
            acquired_at: Utc::now(),
            reason: reason.to_string(),
        };
        let json = serde_json::to_string(&diagnostic).context("failed to serialize diagnostic")?;

        lock.file.set_len(0).context("failed to truncate lock file")?;
        lock.file
            .write_all(json.as_bytes())
            .context("failed to write lock diagnostic")?;
        lock.file.flush().context("failed to flush lock file")?;

        Ok(lock)
    } else {
        let mut diag_file =
            File::open(lock_path).context("failed to open lock file to read diagnostic")?;
        let mut contents = String::new();
        diag_file
            .read_to_string(&mut contents)
            .context("failed to read lock file")?;

        let error_msg = if let Ok(diagnostic) = serde_json::from_str::<LockDiagnostic>(&contents) {
            format!(
                "lock held by PID {} (owner: {}, reason: {}, acquired: {})",
                diagnostic.pid, diagnostic.owner, diagnostic.reason, diagnostic.acquired_at
            )
        } else {
            "lock is held (unable to read diagnostic info)".to_string()
        };

        Err(anyhow::anyhow!(error_msg))
    }
}
