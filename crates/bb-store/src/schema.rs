//! Fixed schema for the shared store. One table per entity named in the
//! store's interface (sessions, commands, user_prompts, tool_uses,
//! egress_blocks, events); egress_blocks and events are carried as row
//! shapes for features this repo does not build out beyond their store
//! presence.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id              TEXT PRIMARY KEY,
    agent           TEXT NOT NULL,
    pid             INTEGER NOT NULL,
    working_dir     TEXT NOT NULL,
    repo_name       TEXT,
    start_time      TEXT NOT NULL,
    end_time        TEXT,
    status          TEXT NOT NULL DEFAULT 'running',
    command_count   INTEGER NOT NULL DEFAULT 0,
    blocked_count   INTEGER NOT NULL DEFAULT 0,
    cumulative_risk INTEGER NOT NULL DEFAULT 0,
    metadata        TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS commands (
    id            TEXT PRIMARY KEY,
    session_id    TEXT,
    timestamp     TEXT NOT NULL,
    command       TEXT NOT NULL,
    allowed       INTEGER NOT NULL,
    risk_score    INTEGER NOT NULL,
    risk_level    TEXT NOT NULL,
    risk_factors  TEXT NOT NULL DEFAULT '[]',
    duration_ms   INTEGER NOT NULL,
    violations    TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS user_prompts (
    id              TEXT PRIMARY KEY,
    session_id      TEXT,
    timestamp       TEXT NOT NULL,
    prompt          TEXT NOT NULL,
    original_length INTEGER NOT NULL,
    word_count      INTEGER NOT NULL,
    char_length     INTEGER NOT NULL,
    working_dir     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_uses (
    id          TEXT PRIMARY KEY,
    session_id  TEXT,
    tool_name   TEXT NOT NULL,
    input       TEXT NOT NULL,
    output      TEXT NOT NULL,
    exit_code   INTEGER,
    success     INTEGER,
    working_dir TEXT NOT NULL,
    repo_info   TEXT
);

CREATE TABLE IF NOT EXISTS egress_blocks (
    id          TEXT PRIMARY KEY,
    session_id  TEXT,
    timestamp   TEXT NOT NULL,
    destination TEXT NOT NULL,
    reason      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id          TEXT PRIMARY KEY,
    session_id  TEXT,
    timestamp   TEXT NOT NULL,
    kind        TEXT NOT NULL,
    payload     TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_commands_timestamp ON commands(timestamp);
CREATE INDEX IF NOT EXISTS idx_commands_session ON commands(session_id);
CREATE INDEX IF NOT EXISTS idx_user_prompts_session ON user_prompts(session_id);
CREATE INDEX IF NOT EXISTS idx_user_prompts_timestamp ON user_prompts(timestamp);
"#;
