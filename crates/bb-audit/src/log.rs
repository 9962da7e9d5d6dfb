//! C10 local half: append-only `audit.log` with exclusive-create locking
//! and size-based rotation into `.1`..`.5` generations.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::lock;

const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const MAX_GENERATIONS: u32 = 5;
const COMMAND_CHAR_CAP: usize = 1000;

/// Strip everything but ASCII-printable characters and cap length so a
/// hostile command can't corrupt the log format or blow up its size.
pub fn sanitize_command(command: &str) -> String {
    let filtered: String = command
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    filtered.chars().take(COMMAND_CHAR_CAP).collect()
}

/// Build one audit log line: `[<ISO8601>] <ALLOWED|BLOCKED>[<types>] (<ms>ms) <command>\n`
pub fn format_line(allowed: bool, violation_types: &[String], duration_ms: u64, command: &str) -> String {
    let timestamp = Utc::now().to_rfc3339();
    let status = if allowed { "ALLOWED" } else { "BLOCKED" };
    let types = violation_types.join(",");
    let sanitized = sanitize_command(command);
    format!("[{timestamp}] {status}[{types}] ({duration_ms}ms) {sanitized}\n")
}

/// Append `line` to `log_path`, rotating first if the file has already
/// reached the size cap. Takes the audit lock around the whole operation,
/// proceeding without it if the lock can't be acquired in time.
pub fn append(log_path: &Path, lock_path: &Path, line: &str) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
    }
    let _guard = lock::acquire(lock_path);
    rotate_if_needed(log_path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    file.write_all(line.as_bytes())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn rotate_if_needed(log_path: &Path) -> anyhow::Result<()> {
    let size = std::fs::metadata(log_path).map(|m| m.len()).unwrap_or(0);
    if size < ROTATE_AT_BYTES {
        return Ok(());
    }

    let oldest = rotated_path(log_path, MAX_GENERATIONS);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for gen in (1..MAX_GENERATIONS).rev() {
        let from = rotated_path(log_path, gen);
        let to = rotated_path(log_path, gen + 1);
        if from.exists() {
            std::fs::rename(&from, &to)?;
        }
    }
    std::fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(())
}

fn rotated_path(log_path: &Path, generation: u32) -> std::path::PathBuf {
    let mut name = log_path.as_os_str().to_os_string();
    name.push(format!(".{generation}"));
    std::path::PathBuf::from(name)
}
