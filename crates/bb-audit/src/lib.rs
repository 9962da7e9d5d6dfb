pub mod lock;
pub mod log;
pub mod remote;

use std::path::PathBuf;

use bb_core::Violation;

pub use log::{format_line, sanitize_command};
pub use remote::{RemoteAuditPayload, RemoteViolation};

/// Where audit entries go, mirroring the config's `audit.destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Local,
    Remote,
    Both,
}

pub struct AuditLogger {
    log_path: PathBuf,
    lock_path: PathBuf,
    enabled: bool,
    destination: Destination,
    remote_url: Option<String>,
}

impl AuditLogger {
    pub fn new(
        log_path: PathBuf,
        lock_path: PathBuf,
        enabled: bool,
        destination: Destination,
        remote_url: Option<String>,
    ) -> Self {
        Self {
            log_path,
            lock_path,
            enabled,
            destination,
            remote_url,
        }
    }

    /// Append a decision to the local log and/or send it remotely,
    /// depending on `destination`. Any I/O failure here is logged to
    /// stderr and otherwise ignored -- the decision has already been made.
    pub fn record(
        &self,
        command: &str,
        allowed: bool,
        violations: &[Violation],
        duration_ms: u64,
        agent: Option<&str>,
    ) {
        if !self.enabled {
            return;
        }

        let violation_types: Vec<String> = violations
            .iter()
            .map(|v| v.violation_type.to_string())
            .collect();

        if matches!(self.destination, Destination::Local | Destination::Both) {
            let line = format_line(allowed, &violation_types, duration_ms, command);
            if let Err(err) = log::append(&self.log_path, &self.lock_path, &line) {
                tracing::warn!("audit log append failed, decision unaffected: {err:#}");
            }
        }

        if matches!(self.destination, Destination::Remote | Destination::Both) {
            if let Some(url) = &self.remote_url {
                let payload = RemoteAuditPayload {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    command: sanitize_command(command),
                    allowed,
                    violations: violations
                        .iter()
                        .map(|v| RemoteViolation {
                            violation_type: v.violation_type.to_string(),
                            rule: v.rule.clone(),
                            message: v.message.clone(),
                        })
                        .collect(),
                    duration: duration_ms,
                    agent: agent.map(|a| a.to_string()),
                };
                remote::send(url, &payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_core::{Violation, ViolationType};

    #[test]
    fn test_record_appends_local_line_when_destination_local() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(
            dir.path().join("audit.log"),
            dir.path().join("audit.lock"),
            true,
            Destination::Local,
            None,
        );
        logger.record("ls -la", true, &[], 5, Some("claude-code"));
        let contents = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(contents.contains("ALLOWED[] (5ms) ls -la"));
    }

    #[test]
    fn test_record_includes_violation_types_for_blocked_command() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(
            dir.path().join("audit.log"),
            dir.path().join("audit.lock"),
            true,
            Destination::Local,
            None,
        );
        let violation = Violation::new(ViolationType::Command, "block:rm -rf /", "blocked");
        logger.record("rm -rf /", false, &[violation], 2, None);
        let contents = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(contents.contains("BLOCKED[command] (2ms) rm -rf /"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(
            log_path.clone(),
            dir.path().join("audit.lock"),
            false,
            Destination::Local,
            None,
        );
        logger.record("ls", true, &[], 1, None);
        assert!(!log_path.exists());
    }
}
