//! The read/write surface rate limiting, loop detection, and anomaly
//! detection need from the shared store. Kept separate from `Store`'s full
//! API so those checks can be unit-tested against a fake store.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::store::{NewCommand, Store};

pub trait CommandStore {
    /// Count of commands recorded across all sessions since `since`.
    fn count_commands_since(&self, since: DateTime<Utc>) -> Result<i64>;

    /// Total commands recorded across all sessions, ever.
    fn total_command_count(&self) -> Result<i64>;

    /// Count of commands recorded within a single session.
    fn session_command_count(&self, session_id: &str) -> Result<i64>;

    /// The most recent commands issued in this session, newest first.
    fn recent_commands_for_session(&self, session_id: &str, limit: i64) -> Result<Vec<String>>;

    /// Persist a command record.
    fn record_command(&self, rec: &NewCommand) -> Result<String>;
}

impl CommandStore for Store {
    fn count_commands_since(&self, since: DateTime<Utc>) -> Result<i64> {
        self.get_command_count_since(since)
    }

    fn total_command_count(&self) -> Result<i64> {
        self.get_total_command_count()
    }

    fn session_command_count(&self, session_id: &str) -> Result<i64> {
        self.get_session_command_count(session_id)
    }

    fn recent_commands_for_session(&self, session_id: &str, limit: i64) -> Result<Vec<String>> {
        let rows = self.get_commands(Some(session_id), Some(limit))?;
        Ok(rows.into_iter().map(|r| r.command).collect())
    }

    fn record_command(&self, rec: &NewCommand) -> Result<String> {
        self.insert_command(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_implements_command_store() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .record_command(&NewCommand {
                session_id: None,
                command: "ls".into(),
                allowed: true,
                risk_score: 1,
                risk_level: "safe".into(),
                risk_factors: vec![],
                duration_ms: 1,
                violations: vec![],
            })
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.total_command_count().unwrap(), 1);
    }
}
