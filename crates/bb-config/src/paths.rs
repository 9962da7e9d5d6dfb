use std::path::PathBuf;

/// Fixed state directory name under the user's home, per the external
/// interface contract: `$HOME/.bashbros/`.
pub const STATE_DIR_NAME: &str = ".bashbros";

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// `$HOME/.bashbros`. `None` only if the home directory cannot be resolved.
pub fn state_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(STATE_DIR_NAME))
}

pub fn store_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("dashboard.db"))
}

pub fn audit_log_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("audit.log"))
}

pub fn audit_lock_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("audit.lock"))
}

pub fn undo_dir() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("undo"))
}

pub fn session_allow_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("session-allow.json"))
}

/// Config file search order: project-local, then the two user-level
/// candidates, first existing one wins.
pub fn config_search_paths(project_root: &std::path::Path) -> Vec<PathBuf> {
    let mut candidates = vec![project_root.join(".bashbros.yml")];
    if let Some(home) = home_dir() {
        candidates.push(home.join(".bashbros.yml"));
        candidates.push(home.join(STATE_DIR_NAME).join("config.yml"));
    }
    candidates
}

/// First config path that exists, if any.
pub fn resolve_config_path(project_root: &std::path::Path) -> Option<PathBuf> {
    config_search_paths(project_root)
        .into_iter()
        .find(|path| path.exists())
}
