//! C3: path sandbox. Resolves `~` and relative paths to a real path (or the
//! closest existing ancestor's real path, for paths that don't exist yet)
//! before matching against allow/block prefixes, so a symlink can't be used
//! to point a blocked path somewhere it's allowed.

use std::path::{Path, PathBuf};

use bb_core::{Violation, ViolationType};
use bb_patterns::GlobSet;

pub struct PathSandbox {
    allow: GlobSet,
    block: GlobSet,
}

impl PathSandbox {
    pub fn new(allow: &[String], block: &[String]) -> Self {
        Self {
            allow: GlobSet::compile(allow),
            block: GlobSet::compile(block),
        }
    }

    /// Check a single path argument. `None` means allowed.
    pub fn check_path(&self, raw: &str) -> Option<Violation> {
        let expanded = expand_tilde(raw);
        if let Some(violation) = check_symlink_escape(&expanded) {
            return Some(violation);
        }

        let resolved = resolve_real_path(raw);
        let resolved_str = resolved.to_string_lossy().to_string();

        if let Some(rule) = self.block.first_match(&resolved_str) {
            return Some(Violation::new(
                ViolationType::Path,
                format!("block:{rule}"),
                format!("path resolves into a blocked location: {resolved_str}"),
            ));
        }
        if self.allow.is_wildcard_or_empty() || self.allow.matches(&resolved_str) {
            return None;
        }
        Some(Violation::new(
            ViolationType::Path,
            "not_in_allow_list",
            format!("path is not in the allow list: {resolved_str}"),
        ))
    }

    /// Check every path-like token in a command, returning the first
    /// violation found.
    pub fn check_command(&self, command: &str) -> Option<Violation> {
        extract_path_tokens(command)
            .into_iter()
            .find_map(|token| self.check_path(&token))
    }
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    } else if raw == "~" {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home;
        }
    }
    PathBuf::from(raw)
}

/// Resolve a path to its real, symlink-free form. Existing paths are
/// canonicalized outright; for paths that don't exist yet, the nearest
/// existing ancestor is canonicalized and the missing suffix reattached, so
/// a not-yet-created file under a blocked symlinked directory still resolves
/// to the blocked location.
fn resolve_real_path(raw: &str) -> PathBuf {
    let expanded = expand_tilde(raw);
    if let Ok(canon) = expanded.canonicalize() {
        return canon;
    }
    let mut ancestor = expanded.as_path();
    let mut suffix: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        match ancestor.parent() {
            Some(parent) => {
                if let Some(name) = ancestor.file_name() {
                    suffix.push(name);
                }
                ancestor = parent;
                if let Ok(canon) = ancestor.canonicalize() {
                    let mut result = canon;
                    for part in suffix.iter().rev() {
                        result.push(part);
                    }
                    return result;
                }
            }
            None => return expanded,
        }
    }
}

/// A symlink whose real target's top-level component differs from its own
/// apparent top-level component is trying to make a path look like it lives
/// somewhere it doesn't, e.g. an innocuous-looking `~/workspace/out` that is
/// actually a symlink into `/etc`. Checked before the ancestor-canonicalize
/// logic in `resolve_real_path` so a symlink can't simply be followed into a
/// blocked location and reported as that location instead of as an escape.
fn check_symlink_escape(expanded: &Path) -> Option<Violation> {
    let metadata = expanded.symlink_metadata().ok()?;
    if !metadata.file_type().is_symlink() {
        return None;
    }
    let real = expanded.canonicalize().ok()?;
    if first_segment(expanded) == first_segment(&real) {
        return None;
    }
    Some(Violation::new(
        ViolationType::Path,
        "symlink_escape",
        format!(
            "path is a symlink resolving outside its apparent location: {} -> {}",
            expanded.display(),
            real.display()
        ),
    ))
}

fn first_segment(path: &Path) -> Option<std::ffi::OsString> {
    path.components().find_map(|c| match c {
        std::path::Component::Normal(s) => Some(s.to_os_string()),
        _ => None,
    })
}

/// Pull out command-line tokens that look like filesystem paths: absolute,
/// `~`-relative, or containing a path separator.
pub(crate) fn extract_path_tokens(command: &str) -> Vec<String> {
    command
        .split_whitespace()
        .filter(|tok| {
            tok.starts_with('/') || tok.starts_with('~') || tok.contains('/') && !tok.starts_with("http")
        })
        .map(|tok| tok.trim_matches(|c| c == '"' || c == '\'').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_prefix_rejects_path() {
        let sandbox = PathSandbox::new(&["*".to_string()], &["/etc/shadow".to_string()]);
        assert!(sandbox.check_path("/etc/shadow").is_some());
    }

    #[test]
    fn test_allowed_wildcard_permits_any_unblocked_path() {
        let sandbox = PathSandbox::new(&["*".to_string()], &["/etc/shadow".to_string()]);
        assert!(sandbox.check_path("/tmp/file.txt").is_none());
    }

    #[test]
    fn test_extract_path_tokens_skips_urls_and_flags() {
        let tokens = extract_path_tokens("curl https://example.com/x -o /tmp/out");
        assert!(!tokens.iter().any(|t| t.starts_with("http")));
        assert!(tokens.iter().any(|t| t == "/tmp/out"));
    }

    #[test]
    fn test_check_command_finds_blocked_path_among_tokens() {
        let sandbox = PathSandbox::new(&["*".to_string()], &["/etc/shadow".to_string()]);
        let violation = sandbox.check_command("cat /etc/shadow").unwrap();
        assert_eq!(violation.rule, "block:/etc/shadow");
    }

    #[test]
    fn test_symlink_escaping_to_a_different_top_level_dir_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let target = std::path::Path::new("/etc/shadow");
        let link = dir.path().join("innocuous-looking-file");
        std::os::unix::fs::symlink(target, &link).unwrap();

        let sandbox = PathSandbox::new(&["*".to_string()], &[]);
        let violation = sandbox.check_path(&link.to_string_lossy()).unwrap();
        assert_eq!(violation.rule, "symlink_escape");
    }

    #[test]
    fn test_symlink_within_the_same_top_level_dir_is_not_flagged_as_escape() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real-file");
        std::fs::write(&target, "contents").unwrap();
        let link = dir.path().join("link-file");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let sandbox = PathSandbox::new(&["*".to_string()], &[]);
        assert!(sandbox.check_path(&link.to_string_lossy()).is_none());
    }

    #[test]
    fn test_nonexistent_path_still_resolves_against_existing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let block_path = dir.path().join("blocked");
        std::fs::create_dir(&block_path).unwrap();
        let sandbox = PathSandbox::new(
            &["*".to_string()],
            &[block_path.to_string_lossy().to_string()],
        );
        let missing = block_path.join("not-yet-created.txt");
        assert!(sandbox.check_path(&missing.to_string_lossy()).is_some());
    }
}
