//! C12: session manager. A thin wrapper over the shared store: starts and
//! ends sessions, and records commands against the currently open one. At
//! most one session is open per process; starting again while one is open
//! simply overwrites the in-memory handle (the old session is left
//! `running` in the store until something ends it explicitly).

use std::sync::Mutex;

use bb_core::Violation;
use bb_store::{NewCommand, SessionUpdate, Store};
use chrono::Utc;

/// How often (in commands) the session's running counters are flushed to
/// the store, so a crash doesn't lose more than this many commands' worth
/// of counter state.
const FLUSH_EVERY: u32 = 10;

struct OpenSession {
    id: String,
    command_count: i64,
    blocked_count: i64,
    cumulative_risk: i64,
    since_flush: u32,
}

pub struct SessionManager<'a> {
    store: &'a Store,
    current: Mutex<Option<OpenSession>>,
}

impl<'a> SessionManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Start a new session, becoming the process's current one. Idempotent
    /// by overwriting: calling this twice just replaces the in-memory
    /// handle with a fresh session id.
    pub fn start(&self, agent: &str, pid: u32, cwd: &str, repo_name: Option<&str>) -> anyhow::Result<String> {
        let id = self.store.insert_session(agent, pid, cwd, repo_name)?;
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current = Some(OpenSession {
            id: id.clone(),
            command_count: 0,
            blocked_count: 0,
            cumulative_risk: 0,
            since_flush: 0,
        });
        Ok(id)
    }

    /// Record a command against the current session, bumping its counters.
    /// Counters are flushed to the store every `FLUSH_EVERY` calls and
    /// always flushed immediately if there is no current session tracked
    /// in memory (e.g. after a process restart) by no-op: the caller must
    /// have called `start` first in that case.
    pub fn record(
        &self,
        command: &str,
        allowed: bool,
        risk_score: u8,
        risk_level: &str,
        risk_factors: Vec<String>,
        violations: &[Violation],
        duration_ms: i64,
    ) -> anyhow::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        let Some(session) = current.as_mut() else {
            // No open session tracked: still record the command, just not
            // tied to a session.
            self.store.record_command_detached(
                None,
                command,
                allowed,
                risk_score,
                risk_level,
                risk_factors,
                duration_ms,
                violations,
            )?;
            return Ok(());
        };

        self.store.record_command_detached(
            Some(session.id.clone()),
            command,
            allowed,
            risk_score,
            risk_level,
            risk_factors,
            duration_ms,
            violations,
        )?;

        session.command_count += 1;
        if !allowed {
            session.blocked_count += 1;
        }
        session.cumulative_risk += risk_score as i64;
        session.since_flush += 1;

        if session.since_flush >= FLUSH_EVERY {
            self.flush(session)?;
        }
        Ok(())
    }

    fn flush(&self, session: &mut OpenSession) -> anyhow::Result<()> {
        self.store.update_session(
            &session.id,
            &SessionUpdate {
                command_count: Some(session.command_count),
                blocked_count: Some(session.blocked_count),
                cumulative_risk: Some(session.cumulative_risk),
                ..Default::default()
            },
        )?;
        session.since_flush = 0;
        Ok(())
    }

    /// End the current session normally, flushing final counters.
    pub fn end(&self) -> anyhow::Result<()> {
        self.finish("completed")
    }

    /// Mark the current session as crashed rather than completed.
    pub fn crash(&self) -> anyhow::Result<()> {
        self.finish("crashed")
    }

    fn finish(&self, status: &str) -> anyhow::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        let Some(session) = current.as_mut() else {
            return Ok(());
        };
        self.store.update_session(
            &session.id,
            &SessionUpdate {
                command_count: Some(session.command_count),
                blocked_count: Some(session.blocked_count),
                cumulative_risk: Some(session.cumulative_risk),
                status: Some(status.to_string()),
                end_time: Some(Utc::now()),
                ..Default::default()
            },
        )?;
        *current = None;
        Ok(())
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|s| s.id.clone())
    }

    /// Attach to a session a prior process already started, hydrating the
    /// in-memory counters from the store so increments continue from where
    /// that process left off instead of restarting at zero. Every CLI
    /// subcommand is a fresh process, so without this the store's
    /// `command_count`/`blocked_count`/`cumulative_risk` columns would never
    /// advance past whatever a single invocation accumulates before exiting.
    pub fn attach(store: &'a Store, session_id: &str) -> anyhow::Result<Self> {
        let manager = Self::new(store);
        if let Some(row) = store.get_session(session_id)? {
            let mut current = manager.current.lock().unwrap_or_else(|p| p.into_inner());
            *current = Some(OpenSession {
                id: row.id,
                command_count: row.command_count,
                blocked_count: row.blocked_count,
                cumulative_risk: row.cumulative_risk,
                since_flush: 0,
            });
        }
        Ok(manager)
    }

    /// Force an immediate flush of the current session's counters,
    /// bypassing the `FLUSH_EVERY` cadence. A fresh-process caller exits
    /// right after one `record` call and would otherwise never reach the
    /// periodic threshold.
    pub fn flush_now(&self) -> anyhow::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        let Some(session) = current.as_mut() else {
            return Ok(());
        };
        self.flush(session)
    }
}

/// Find the most recently started still-`running` session in the store.
/// The gate and record CLI commands run as a fresh process per invocation,
/// so they use this instead of an in-process handle to find the session a
/// prior `session-start` call opened.
pub fn find_running_session(store: &Store, agent: Option<&str>) -> anyhow::Result<Option<bb_store::SessionRow>> {
    let sessions = store.get_sessions(agent, 20)?;
    Ok(sessions.into_iter().find(|s| s.status == "running"))
}

/// Extension used internally so `SessionManager::record` doesn't need to
/// duplicate `NewCommand` construction twice.
trait RecordCommandDetached {
    #[allow(clippy::too_many_arguments)]
    fn record_command_detached(
        &self,
        session_id: Option<String>,
        command: &str,
        allowed: bool,
        risk_score: u8,
        risk_level: &str,
        risk_factors: Vec<String>,
        duration_ms: i64,
        violations: &[Violation],
    ) -> anyhow::Result<String>;
}

impl RecordCommandDetached for Store {
    fn record_command_detached(
        &self,
        session_id: Option<String>,
        command: &str,
        allowed: bool,
        risk_score: u8,
        risk_level: &str,
        risk_factors: Vec<String>,
        duration_ms: i64,
        violations: &[Violation],
    ) -> anyhow::Result<String> {
        self.insert_command(&NewCommand {
            session_id,
            command: command.to_string(),
            allowed,
            risk_score,
            risk_level: risk_level.to_string(),
            risk_factors,
            duration_ms,
            violations: violations.iter().map(|v| v.message.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_returns_session_id_and_tracks_it() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let id = manager.start("claude-code", 1, "/tmp", None).unwrap();
        assert_eq!(manager.current_session_id(), Some(id));
    }

    #[test]
    fn test_start_twice_overwrites_current_handle() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let first = manager.start("agent", 1, "/tmp", None).unwrap();
        let second = manager.start("agent", 1, "/tmp", None).unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.current_session_id(), Some(second));
    }

    #[test]
    fn test_record_bumps_counters_and_caps_blocked_at_command_count() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let id = manager.start("agent", 1, "/tmp", None).unwrap();
        manager
            .record("ls", true, 1, "safe", vec![], &[], 5)
            .unwrap();
        manager
            .record("rm -rf /", false, 10, "critical", vec![], &[], 5)
            .unwrap();
        manager.end().unwrap();
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.command_count, 2);
        assert_eq!(session.blocked_count, 1);
        assert!(session.blocked_count <= session.command_count);
        assert_eq!(session.status, "completed");
    }

    #[test]
    fn test_crash_marks_session_crashed() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let id = manager.start("agent", 1, "/tmp", None).unwrap();
        manager.crash().unwrap();
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.status, "crashed");
        assert!(manager.current_session_id().is_none());
    }

    #[test]
    fn test_record_without_open_session_still_persists_command() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        manager.record("ls", true, 1, "safe", vec![], &[], 5).unwrap();
        assert_eq!(store.get_total_command_count().unwrap(), 1);
    }

    #[test]
    fn test_attach_hydrates_counters_and_continues_accumulating() {
        let store = Store::open_in_memory().unwrap();
        let first_process = SessionManager::new(&store);
        let id = first_process.start("agent", 1, "/tmp", None).unwrap();
        first_process
            .record("ls", true, 1, "safe", vec![], &[], 5)
            .unwrap();
        first_process.flush_now().unwrap();

        // A later process picks the session back up instead of starting
        // its in-memory counters at zero.
        let second_process = SessionManager::attach(&store, &id).unwrap();
        second_process
            .record("rm -rf /", false, 10, "critical", vec![], &[], 5)
            .unwrap();
        second_process.flush_now().unwrap();

        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.command_count, 2);
        assert_eq!(session.blocked_count, 1);
        assert_eq!(session.cumulative_risk, 11);
    }

    #[test]
    fn test_flush_now_persists_a_single_command_immediately() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let id = manager.start("agent", 1, "/tmp", None).unwrap();
        manager.record("ls", true, 1, "safe", vec![], &[], 1).unwrap();
        manager.flush_now().unwrap();
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.command_count, 1);
    }

    #[test]
    fn test_flush_happens_every_ten_commands() {
        let store = Store::open_in_memory().unwrap();
        let manager = SessionManager::new(&store);
        let id = manager.start("agent", 1, "/tmp", None).unwrap();
        for _ in 0..10 {
            manager.record("ls", true, 1, "safe", vec![], &[], 1).unwrap();
        }
        // Flushed without calling end().
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.command_count, 10);
    }
}
