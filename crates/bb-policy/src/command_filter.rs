//! C2: static allow/block command filter. Block list wins over allow list;
//! an empty or wildcard allow list means "allow anything not blocked".

use bb_core::{Violation, ViolationType};
use bb_patterns::GlobSet;

pub struct CommandFilter {
    block: GlobSet,
    allow: GlobSet,
}

impl CommandFilter {
    pub fn new(allow: &[String], block: &[String]) -> Self {
        Self {
            block: GlobSet::compile(block),
            allow: GlobSet::compile(allow),
        }
    }

    /// `None` means allowed. Block is checked first: a blocked command is
    /// never rescued by also matching an allow pattern.
    pub fn check(&self, command: &str) -> Option<Violation> {
        if let Some(rule) = self.block.first_match(command) {
            return Some(Violation::new(
                ViolationType::Command,
                format!("block:{rule}"),
                format!("command matches a blocked pattern: {command}"),
            ));
        }
        if self.allow.is_wildcard_or_empty() || self.allow.matches(command) {
            return None;
        }
        Some(Violation::new(
            ViolationType::Command,
            "not-allowed",
            format!("command is not in the allow list: {command}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_wins_over_allow() {
        let filter = CommandFilter::new(&["rm *".to_string()], &["rm -rf /".to_string()]);
        let violation = filter.check("rm -rf /").unwrap();
        assert_eq!(violation.rule, "block:rm -rf /");
    }

    #[test]
    fn test_empty_allow_list_permits_anything_not_blocked() {
        let filter = CommandFilter::new(&[], &[]);
        assert!(filter.check("ls -la").is_none());
    }

    #[test]
    fn test_wildcard_allow_permits_anything_not_blocked() {
        let filter = CommandFilter::new(&["*".to_string()], &["rm -rf /".to_string()]);
        assert!(filter.check("npm install").is_none());
        assert!(filter.check("rm -rf /").is_some());
    }

    #[test]
    fn test_strict_allow_list_rejects_unlisted_commands() {
        let filter = CommandFilter::new(&["git *".to_string()], &[]);
        assert!(filter.check("git status").is_none());
        assert!(filter.check("curl http://example.com").is_some());
    }
}
