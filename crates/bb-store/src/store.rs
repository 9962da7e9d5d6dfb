use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use crate::schema::SCHEMA_SQL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub agent: String,
    pub pid: i64,
    pub working_dir: String,
    pub repo_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
    pub command_count: i64,
    pub blocked_count: i64,
    pub cumulative_risk: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub command_count: Option<i64>,
    pub blocked_count: Option<i64>,
    pub cumulative_risk: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewCommand {
    pub session_id: Option<String>,
    pub command: String,
    pub allowed: bool,
    pub risk_score: u8,
    pub risk_level: String,
    pub risk_factors: Vec<String>,
    pub duration_ms: i64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRow {
    pub id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub allowed: bool,
    pub risk_score: u8,
    pub risk_level: String,
    pub risk_factors: Vec<String>,
    pub duration_ms: i64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewUserPrompt {
    pub session_id: Option<String>,
    pub prompt: String,
    pub original_length: i64,
    pub working_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptRow {
    pub id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub original_length: i64,
    pub word_count: i64,
    pub char_length: i64,
    pub working_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPromptStats {
    pub total_prompts: i64,
    pub total_word_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewToolUse {
    pub session_id: Option<String>,
    pub tool_name: String,
    pub input: String,
    pub output: String,
    pub exit_code: Option<i64>,
    pub success: Option<bool>,
    pub working_dir: String,
    pub repo_info: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub total_commands: i64,
    pub allowed_commands: i64,
    pub blocked_commands: i64,
    pub avg_risk_score: f64,
    pub risk_distribution: std::collections::HashMap<String, i64>,
    pub top_commands: Vec<(String, i64)>,
}

/// The user-prompt cap mentioned in §3: prompts are truncated for storage
/// but the original length is preserved.
pub const USER_PROMPT_MAX_CHARS: usize = 50_000;

/// Cap for the command text a loop/rate query fetches back for comparison.
const DEFAULT_LIMIT: i64 = 100;

/// Persistent store of sessions, commands, prompts, tool-uses, and
/// achievement stats. A single `Mutex<Connection>` per process serializes
/// writes; SQLite's own file locking serializes writers across processes.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory: {}", parent.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                    .with_context(|| format!("failed to set store directory permissions: {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to set store file permissions: {}", path.display()))?;
        }
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to set WAL journal mode")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("failed to set busy_timeout")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to apply store schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests that don't want a file on disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to apply store schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_session(
        &self,
        agent: &str,
        pid: u32,
        working_dir: &str,
        repo_name: Option<&str>,
    ) -> Result<String> {
        let id = ulid::Ulid::new().to_string();
        let now = Utc::now();
        self.lock().execute(
            "INSERT INTO sessions (id, agent, pid, working_dir, repo_name, start_time, status, \
             command_count, blocked_count, cumulative_risk, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'running', 0, 0, 0, '{}')",
            params![id, agent, pid, working_dir, repo_name, now.to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn update_session(&self, id: &str, update: &SessionUpdate) -> Result<()> {
        let conn = self.lock();
        if let Some(end_time) = &update.end_time {
            conn.execute(
                "UPDATE sessions SET end_time = ?1 WHERE id = ?2",
                params![end_time.to_rfc3339(), id],
            )?;
        }
        if let Some(status) = &update.status {
            conn.execute(
                "UPDATE sessions SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
        }
        if let Some(command_count) = update.command_count {
            conn.execute(
                "UPDATE sessions SET command_count = ?1 WHERE id = ?2",
                params![command_count, id],
            )?;
        }
        if let Some(blocked_count) = update.blocked_count {
            conn.execute(
                "UPDATE sessions SET blocked_count = ?1 WHERE id = ?2",
                params![blocked_count, id],
            )?;
        }
        if let Some(cumulative_risk) = update.cumulative_risk {
            conn.execute(
                "UPDATE sessions SET cumulative_risk = ?1 WHERE id = ?2",
                params![cumulative_risk, id],
            )?;
        }
        if let Some(metadata) = &update.metadata {
            conn.execute(
                "UPDATE sessions SET metadata = ?1 WHERE id = ?2",
                params![metadata.to_string(), id],
            )?;
        }
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, agent, pid, working_dir, repo_name, start_time, end_time, status, \
             command_count, blocked_count, cumulative_risk, metadata FROM sessions WHERE id = ?1",
            params![id],
            row_to_session,
        )
        .optional()
        .context("failed reading session")
    }

    pub fn get_sessions(&self, agent: Option<&str>, limit: i64) -> Result<Vec<SessionRow>> {
        let conn = self.lock();
        let sql = "SELECT id, agent, pid, working_dir, repo_name, start_time, end_time, status, \
                    command_count, blocked_count, cumulative_risk, metadata FROM sessions \
                    WHERE (?1 IS NULL OR agent = ?1) ORDER BY start_time DESC LIMIT ?2";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![agent, limit], row_to_session)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed reading sessions")
    }

    pub fn insert_command(&self, rec: &NewCommand) -> Result<String> {
        let id = ulid::Ulid::new().to_string();
        let now = Utc::now();
        let risk_factors = serde_json::to_string(&rec.risk_factors)?;
        let violations = serde_json::to_string(&rec.violations)?;
        self.lock().execute(
            "INSERT INTO commands (id, session_id, timestamp, command, allowed, risk_score, \
             risk_level, risk_factors, duration_ms, violations) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                rec.session_id,
                now.to_rfc3339(),
                rec.command,
                rec.allowed as i64,
                rec.risk_score,
                rec.risk_level,
                risk_factors,
                rec.duration_ms,
                violations,
            ],
        )?;
        Ok(id)
    }

    pub fn get_commands(
        &self,
        session_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<CommandRow>> {
        let conn = self.lock();
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let sql = "SELECT id, session_id, timestamp, command, allowed, risk_score, risk_level, \
                    risk_factors, duration_ms, violations FROM commands \
                    WHERE (?1 IS NULL OR session_id = ?1) ORDER BY timestamp DESC LIMIT ?2";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![session_id, limit], row_to_command)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed reading commands")
    }

    pub fn search_commands(&self, query: &str, limit: i64) -> Result<Vec<CommandRow>> {
        let conn = self.lock();
        let needle = format!("%{}%", query.to_lowercase());
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, command, allowed, risk_score, risk_level, \
             risk_factors, duration_ms, violations FROM commands \
             WHERE lower(command) LIKE ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![needle, limit], row_to_command)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed searching commands")
    }

    pub fn get_total_command_count(&self) -> Result<i64> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))
            .context("failed counting commands")
    }

    pub fn get_recent_command_texts(&self, n: i64) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT command FROM commands ORDER BY timestamp DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![n], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed reading recent command texts")
    }

    pub fn get_command_count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM commands WHERE timestamp >= ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )
        .context("failed counting commands since timestamp")
    }

    pub fn get_session_command_count(&self, session_id: &str) -> Result<i64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM commands WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )
        .context("failed counting session commands")
    }

    pub fn insert_user_prompt(&self, rec: &NewUserPrompt) -> Result<String> {
        let id = ulid::Ulid::new().to_string();
        let now = Utc::now();
        let truncated: String = rec.prompt.chars().take(USER_PROMPT_MAX_CHARS).collect();
        let word_count = truncated.split_whitespace().count() as i64;
        let char_length = truncated.chars().count() as i64;
        self.lock().execute(
            "INSERT INTO user_prompts (id, session_id, timestamp, prompt, original_length, \
             word_count, char_length, working_dir) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                rec.session_id,
                now.to_rfc3339(),
                truncated,
                rec.original_length,
                word_count,
                char_length,
                rec.working_dir,
            ],
        )?;
        Ok(id)
    }

    pub fn get_user_prompts(
        &self,
        session_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<UserPromptRow>> {
        let conn = self.lock();
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let since_str = since.map(|ts| ts.to_rfc3339());
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, prompt, original_length, word_count, \
             char_length, working_dir FROM user_prompts \
             WHERE (?1 IS NULL OR session_id = ?1) AND (?2 IS NULL OR timestamp >= ?2) \
             ORDER BY timestamp DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![session_id, since_str, limit], row_to_prompt)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed reading user prompts")
    }

    pub fn get_user_prompt_stats(&self) -> Result<UserPromptStats> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(word_count), 0) FROM user_prompts",
            [],
            |row| {
                Ok(UserPromptStats {
                    total_prompts: row.get(0)?,
                    total_word_count: row.get(1)?,
                })
            },
        )
        .context("failed reading user prompt stats")
    }

    pub fn insert_tool_use(&self, rec: &NewToolUse) -> Result<String> {
        let id = ulid::Ulid::new().to_string();
        self.lock().execute(
            "INSERT INTO tool_uses (id, session_id, tool_name, input, output, exit_code, \
             success, working_dir, repo_info) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                rec.session_id,
                rec.tool_name,
                rec.input,
                rec.output,
                rec.exit_code,
                rec.success.map(|s| s as i64),
                rec.working_dir,
                rec.repo_info,
            ],
        )?;
        Ok(id)
    }

    pub fn get_session_metrics(&self, session_id: &str) -> Result<SessionMetrics> {
        let conn = self.lock();
        let (total, allowed, blocked, avg_risk): (i64, i64, i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(allowed), 0), COALESCE(SUM(1 - allowed), 0), \
             AVG(risk_score) FROM commands WHERE session_id = ?1",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut risk_distribution = std::collections::HashMap::new();
        let mut stmt = conn.prepare(
            "SELECT risk_level, COUNT(*) FROM commands WHERE session_id = ?1 GROUP BY risk_level",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (level, count) = row?;
            risk_distribution.insert(level, count);
        }

        let mut stmt = conn.prepare(
            "SELECT command, COUNT(*) as c FROM commands WHERE session_id = ?1 \
             GROUP BY command ORDER BY c DESC LIMIT 5",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let top_commands = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SessionMetrics {
            total_commands: total,
            allowed_commands: allowed,
            blocked_commands: blocked,
            avg_risk_score: avg_risk.unwrap_or(0.0),
            risk_distribution,
            top_commands,
        })
    }

    /// Delete user-prompt, command, and event rows older than the cutoff.
    /// Recent rows are never touched.
    pub fn cleanup(&self, retention_days: i64) -> Result<()> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let cutoff_str = cutoff.to_rfc3339();
        let conn = self.lock();
        conn.execute(
            "DELETE FROM commands WHERE timestamp < ?1",
            params![cutoff_str],
        )?;
        conn.execute(
            "DELETE FROM user_prompts WHERE timestamp < ?1",
            params![cutoff_str],
        )?;
        conn.execute(
            "DELETE FROM events WHERE timestamp < ?1",
            params![cutoff_str],
        )?;
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRow> {
    let start_time: String = row.get(5)?;
    let end_time: Option<String> = row.get(6)?;
    let metadata: String = row.get(11)?;
    Ok(SessionRow {
        id: row.get(0)?,
        agent: row.get(1)?,
        pid: row.get(2)?,
        working_dir: row.get(3)?,
        repo_name: row.get(4)?,
        start_time: parse_rfc3339(&start_time),
        end_time: end_time.as_deref().map(parse_rfc3339),
        status: row.get(7)?,
        command_count: row.get(8)?,
        blocked_count: row.get(9)?,
        cumulative_risk: row.get(10)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_command(row: &rusqlite::Row) -> rusqlite::Result<CommandRow> {
    let timestamp: String = row.get(2)?;
    let allowed: i64 = row.get(4)?;
    let risk_score: i64 = row.get(5)?;
    let risk_factors: String = row.get(7)?;
    let violations: String = row.get(9)?;
    Ok(CommandRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        timestamp: parse_rfc3339(&timestamp),
        command: row.get(3)?,
        allowed: allowed != 0,
        risk_score: risk_score as u8,
        risk_level: row.get(6)?,
        risk_factors: serde_json::from_str(&risk_factors).unwrap_or_default(),
        duration_ms: row.get(8)?,
        violations: serde_json::from_str(&violations).unwrap_or_default(),
    })
}

fn row_to_prompt(row: &rusqlite::Row) -> rusqlite::Result<UserPromptRow> {
    let timestamp: String = row.get(2)?;
    Ok(UserPromptRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        timestamp: parse_rfc3339(&timestamp),
        prompt: row.get(3)?,
        original_length: row.get(4)?,
        word_count: row.get(5)?,
        char_length: row.get(6)?,
        working_dir: row.get(7)?,
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_session() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .insert_session("claude-code", 123, "/tmp/proj", Some("myrepo"))
            .unwrap();
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.agent, "claude-code");
        assert_eq!(session.status, "running");
        assert_eq!(session.command_count, 0);
    }

    #[test]
    fn test_update_session_persists_counters() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_session("agent", 1, "/tmp", None).unwrap();
        store
            .update_session(
                &id,
                &SessionUpdate {
                    command_count: Some(5),
                    blocked_count: Some(2),
                    status: Some("completed".into()),
                    end_time: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .unwrap();
        let session = store.get_session(&id).unwrap().unwrap();
        assert_eq!(session.command_count, 5);
        assert_eq!(session.blocked_count, 2);
        assert_eq!(session.status, "completed");
        assert!(session.end_time.is_some());
    }

    #[test]
    fn test_insert_command_and_count_since() {
        let store = Store::open_in_memory().unwrap();
        let session_id = store.insert_session("agent", 1, "/tmp", None).unwrap();
        for i in 0..3 {
            store
                .insert_command(&NewCommand {
                    session_id: Some(session_id.clone()),
                    command: format!("echo {i}"),
                    allowed: true,
                    risk_score: 1,
                    risk_level: "safe".into(),
                    risk_factors: vec![],
                    duration_ms: 10,
                    violations: vec![],
                })
                .unwrap();
        }
        assert_eq!(store.get_total_command_count().unwrap(), 3);
        let since = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.get_command_count_since(since).unwrap(), 3);
        assert_eq!(store.get_session_command_count(&session_id).unwrap(), 3);
    }

    #[test]
    fn test_recent_command_texts_most_recent_first() {
        let store = Store::open_in_memory().unwrap();
        for cmd in ["a", "b", "c"] {
            store
                .insert_command(&NewCommand {
                    session_id: None,
                    command: cmd.into(),
                    allowed: true,
                    risk_score: 1,
                    risk_level: "safe".into(),
                    risk_factors: vec![],
                    duration_ms: 1,
                    violations: vec![],
                })
                .unwrap();
        }
        let texts = store.get_recent_command_texts(2).unwrap();
        assert_eq!(texts, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_search_commands_case_insensitive_substring() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_command(&NewCommand {
                session_id: None,
                command: "git STATUS".into(),
                allowed: true,
                risk_score: 1,
                risk_level: "safe".into(),
                risk_factors: vec![],
                duration_ms: 1,
                violations: vec![],
            })
            .unwrap();
        let results = store.search_commands("status", 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_user_prompt_truncation_preserves_original_length() {
        let store = Store::open_in_memory().unwrap();
        let long_prompt = "x".repeat(USER_PROMPT_MAX_CHARS + 500);
        let id = store
            .insert_user_prompt(&NewUserPrompt {
                session_id: None,
                prompt: long_prompt.clone(),
                original_length: long_prompt.len() as i64,
                working_dir: "/tmp".into(),
            })
            .unwrap();
        let prompts = store.get_user_prompts(None, None, Some(1)).unwrap();
        let stored = prompts.iter().find(|p| p.id == id).unwrap();
        assert_eq!(stored.char_length as usize, USER_PROMPT_MAX_CHARS);
        assert_eq!(stored.original_length as usize, long_prompt.len());
    }

    #[test]
    fn test_session_metrics_aggregates_across_commands() {
        let store = Store::open_in_memory().unwrap();
        let session_id = store.insert_session("agent", 1, "/tmp", None).unwrap();
        store
            .insert_command(&NewCommand {
                session_id: Some(session_id.clone()),
                command: "ls".into(),
                allowed: true,
                risk_score: 2,
                risk_level: "safe".into(),
                risk_factors: vec![],
                duration_ms: 1,
                violations: vec![],
            })
            .unwrap();
        store
            .insert_command(&NewCommand {
                session_id: Some(session_id.clone()),
                command: "rm -rf /".into(),
                allowed: false,
                risk_score: 10,
                risk_level: "critical".into(),
                risk_factors: vec!["destructive".into()],
                duration_ms: 1,
                violations: vec!["blocked".into()],
            })
            .unwrap();

        let metrics = store.get_session_metrics(&session_id).unwrap();
        assert_eq!(metrics.total_commands, 2);
        assert_eq!(metrics.allowed_commands, 1);
        assert_eq!(metrics.blocked_commands, 1);
        assert_eq!(metrics.avg_risk_score, 6.0);
    }

    #[test]
    fn test_cleanup_deletes_only_old_rows() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_command(&NewCommand {
                session_id: None,
                command: "recent".into(),
                allowed: true,
                risk_score: 1,
                risk_level: "safe".into(),
                risk_factors: vec![],
                duration_ms: 1,
                violations: vec![],
            })
            .unwrap();
        store.cleanup(30).unwrap();
        assert_eq!(store.get_total_command_count().unwrap(), 1);
    }
}
