//! The audit log has its own exclusive-create lock, distinct from the
//! flock-based advisory lock used elsewhere: short retry budget, a
//! staleness timeout that reclaims an abandoned lock file, and a
//! proceed-without-lock fallback so a stuck lock never blocks a decision.

use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, SystemTime};

const RETRY_ATTEMPTS: u32 = 10;
const RETRY_DELAY: Duration = Duration::from_millis(50);
const STALE_AFTER: Duration = Duration::from_secs(5);

pub struct AuditLockGuard {
    path: std::path::PathBuf,
    held: bool,
}

impl Drop for AuditLockGuard {
    fn drop(&mut self) {
        if self.held {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Try to acquire the audit lock. Always returns a guard: `held` tells the
/// caller whether the lock was actually taken, or whether it should proceed
/// without one after exhausting retries.
pub fn acquire(lock_path: &Path) -> AuditLockGuard {
    for attempt in 0..RETRY_ATTEMPTS {
        match OpenOptions::new().write(true).create_new(true).open(lock_path) {
            Ok(_) => {
                return AuditLockGuard {
                    path: lock_path.to_path_buf(),
                    held: true,
                };
            }
            Err(_) => {
                if is_stale(lock_path) {
                    let _ = std::fs::remove_file(lock_path);
                    continue;
                }
                if attempt + 1 < RETRY_ATTEMPTS {
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
    }
    tracing::warn!("audit lock busy after {RETRY_ATTEMPTS} attempts, proceeding without it");
    AuditLockGuard {
        path: lock_path.to_path_buf(),
        held: false,
    }
}

fn is_stale(lock_path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(lock_path) else {
        return true;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > STALE_AFTER)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_succeeds_when_no_lock_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("audit.lock");
        let guard = acquire(&lock_path);
        assert!(guard.held);
        assert!(lock_path.exists());
    }

    #[test]
    fn test_guard_drop_removes_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("audit.lock");
        {
            let _guard = acquire(&lock_path);
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("audit.lock");
        let file = std::fs::File::create(&lock_path).unwrap();
        let old = SystemTime::now() - Duration::from_secs(30);
        file.set_modified(old).unwrap();
        drop(file);

        let guard = acquire(&lock_path);
        assert!(guard.held);
    }
}
