//! C14: undo stack. Before a command modifies or deletes a file, a backup
//! is taken under the per-user undo directory; `undo()` reverses the most
//! recent entry. Oversize files are tracked without a backup rather than
//! silently dropped from the stack, so the operation is still visible even
//! though it can't be reversed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const MAX_BACKUP_BYTES: u64 = 10 * 1024 * 1024;
const MAX_STACK_ENTRIES: usize = 100;
const STACK_FILE: &str = "stack.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoEntry {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub path: PathBuf,
    pub operation: Operation,
    #[serde(default)]
    pub backup_path: Option<PathBuf>,
    #[serde(default)]
    pub command: Option<String>,
}

pub struct UndoStack {
    dir: PathBuf,
}

impl UndoStack {
    /// `dir` is the per-user undo directory; it and its backups are created
    /// with mode 0700 on unix.
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self { dir })
    }

    fn stack_path(&self) -> PathBuf {
        self.dir.join(STACK_FILE)
    }

    fn load(&self) -> Vec<UndoEntry> {
        std::fs::read_to_string(self.stack_path())
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    fn save(&self, entries: &[UndoEntry]) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(self.stack_path(), json)?;
        Ok(())
    }

    fn push(&self, path: &Path, operation: Operation, command: Option<&str>, pre_image: Option<&Path>) -> anyhow::Result<UndoEntry> {
        let id = ulid::Ulid::new().to_string();
        let backup_path = match pre_image {
            Some(source) => self.backup_if_under_cap(&id, source)?,
            None => None,
        };

        let entry = UndoEntry {
            id,
            timestamp: chrono::Utc::now(),
            path: path.to_path_buf(),
            operation,
            backup_path,
            command: command.map(|c| c.to_string()),
        };

        let mut entries = self.load();
        entries.push(entry.clone());
        while entries.len() > MAX_STACK_ENTRIES {
            let evicted = entries.remove(0);
            if let Some(backup) = evicted.backup_path {
                let _ = std::fs::remove_file(backup);
            }
        }
        self.save(&entries)?;
        Ok(entry)
    }

    fn backup_if_under_cap(&self, id: &str, source: &Path) -> anyhow::Result<Option<PathBuf>> {
        let size = std::fs::metadata(source).map(|m| m.len()).unwrap_or(0);
        if size > MAX_BACKUP_BYTES {
            tracing::warn!(
                "file {} exceeds the {MAX_BACKUP_BYTES}-byte backup cap, tracking without a backup",
                source.display()
            );
            return Ok(None);
        }
        let backup_path = self.dir.join(format!("{id}.backup"));
        std::fs::copy(source, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Record that `path` was newly created by `command`. Nothing existed
    /// before, so there's no pre-image to back up.
    pub fn record_create(&self, path: &Path, command: Option<&str>) -> anyhow::Result<UndoEntry> {
        self.push(path, Operation::Create, command, None)
    }

    /// Record that `path` is about to be modified. Call before the write so
    /// the pre-image can be backed up.
    pub fn record_modify(&self, path: &Path, command: Option<&str>) -> anyhow::Result<UndoEntry> {
        self.push(path, Operation::Modify, command, Some(path))
    }

    /// Record that `path` is about to be deleted. Call before the delete so
    /// the pre-image can be backed up.
    pub fn record_delete(&self, path: &Path, command: Option<&str>) -> anyhow::Result<UndoEntry> {
        self.push(path, Operation::Delete, command, Some(path))
    }

    /// Reverse the most recent entry: a create is undone by removing the
    /// path; a modify or delete is undone by restoring its backup, if one
    /// exists. Returns `false` (without error) if the stack is empty.
    pub fn undo(&self) -> anyhow::Result<bool> {
        let mut entries = self.load();
        let Some(entry) = entries.pop() else {
            return Ok(false);
        };

        match entry.operation {
            Operation::Create => {
                if entry.path.exists() {
                    std::fs::remove_file(&entry.path)?;
                }
            }
            Operation::Modify | Operation::Delete => match &entry.backup_path {
                Some(backup) => {
                    if let Some(parent) = entry.path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::copy(backup, &entry.path)?;
                    std::fs::remove_file(backup)?;
                }
                None => {
                    anyhow::bail!(
                        "no backup available for {}; it was tracked without one (oversize)",
                        entry.path.display()
                    );
                }
            },
        }

        self.save(&entries)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_in(dir: &tempfile::TempDir) -> UndoStack {
        UndoStack::new(dir.path().join("undo")).unwrap()
    }

    #[test]
    fn test_record_create_then_undo_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        let target = dir.path().join("new.txt");
        std::fs::write(&target, b"hello").unwrap();
        stack.record_create(&target, Some("touch new.txt")).unwrap();

        assert!(stack.undo().unwrap());
        assert!(!target.exists());
    }

    #[test]
    fn test_record_modify_then_undo_restores_original_content() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        let target = dir.path().join("file.txt");
        std::fs::write(&target, b"original").unwrap();
        stack.record_modify(&target, Some("echo x > file.txt")).unwrap();
        std::fs::write(&target, b"changed").unwrap();

        assert!(stack.undo().unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn test_record_delete_then_undo_recreates_file() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        let target = dir.path().join("doomed.txt");
        std::fs::write(&target, b"keep me").unwrap();
        stack.record_delete(&target, Some("rm doomed.txt")).unwrap();
        std::fs::remove_file(&target).unwrap();

        assert!(stack.undo().unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn test_undo_on_empty_stack_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        assert!(!stack.undo().unwrap());
    }

    #[test]
    fn test_stack_evicts_oldest_entry_past_cap() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        for i in 0..105 {
            let path = dir.path().join(format!("f{i}.txt"));
            std::fs::write(&path, b"x").unwrap();
            stack.record_create(&path, None).unwrap();
        }
        assert_eq!(stack.len(), 100);
    }

    #[test]
    fn test_oversize_file_tracked_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let stack = stack_in(&dir);
        let target = dir.path().join("big.bin");
        std::fs::write(&target, vec![0u8; (MAX_BACKUP_BYTES + 1) as usize]).unwrap();
        let entry = stack.record_modify(&target, None).unwrap();
        assert!(entry.backup_path.is_none());
    }
}
