//! C8: anomaly detector. Skips entirely during the learning phase (measured
//! by the *global* total command count, not a per-session count, per the
//! resolved open question), then flags off-hours activity, unusually high
//! command rates, and commands touching suspicious-looking resources.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use bb_config::Action;
use bb_core::{Violation, ViolationType};
use bb_store::CommandStore;
use chrono::{Duration, Local, Timelike, Utc};
use regex::Regex;

fn suspicious_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let specs = [
            r"passwd",
            r"shadow",
            r"/root/",
            r"\.ssh/",
            r"\.gnupg/",
            r"\.aws/",
            r"\.kube/",
            r"wallet",
            r"crypto",
            r"bitcoin",
            r"ethereum",
            r"private.*key",
        ];
        specs
            .iter()
            .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
            .collect()
    })
}

pub struct AnomalyDetector<'a> {
    store: &'a dyn CommandStore,
    enabled: bool,
    working_hours: (u8, u8),
    typical_commands_per_minute: u32,
    learning_commands: u32,
    extra_patterns: Vec<Regex>,
    action: Action,
}

impl<'a> AnomalyDetector<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn CommandStore,
        enabled: bool,
        working_hours: (u8, u8),
        typical_commands_per_minute: u32,
        learning_commands: u32,
        extra_pattern_sources: &[String],
        action: Action,
    ) -> Self {
        let extra_patterns = extra_pattern_sources
            .iter()
            .filter_map(|src| match Regex::new(src) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!("dropping unparsable anomaly pattern {src:?}: {err}");
                    None
                }
            })
            .collect();
        Self {
            store,
            enabled,
            working_hours,
            typical_commands_per_minute,
            learning_commands,
            extra_patterns,
            action,
        }
    }

    /// Accumulates every matching dimension into one joined violation rather
    /// than stopping at the first hit, so a command that is both off-hours
    /// and high-rate is reported as both.
    pub fn check(&self, command: &str) -> Option<Violation> {
        if !self.enabled {
            return None;
        }
        let total = match self.store.total_command_count() {
            Ok(total) => total,
            Err(err) => {
                tracing::warn!("anomaly detector store error, failing open: {err:#}");
                return None;
            }
        };
        if (total as u32) < self.learning_commands {
            return None;
        }

        let hits = [
            self.check_suspicious_pattern(command),
            self.check_off_hours(),
            self.check_high_rate(),
        ];
        let mut rules = Vec::new();
        let mut messages = Vec::new();
        for (rule, message) in hits.into_iter().flatten() {
            rules.push(rule);
            messages.push(message);
        }

        if rules.is_empty() {
            return None;
        }

        let violation = Violation::new(ViolationType::Anomaly, rules.join(","), messages.join("; "));
        self.apply_action(violation)
    }

    fn apply_action(&self, violation: Violation) -> Option<Violation> {
        match self.action {
            Action::Block => Some(violation),
            Action::Warn => {
                tracing::warn!(rule = %violation.rule, message = %violation.message, "anomaly detector warning (not blocking)");
                None
            }
        }
    }

    fn check_suspicious_pattern(&self, command: &str) -> Option<(&'static str, String)> {
        suspicious_patterns()
            .iter()
            .chain(self.extra_patterns.iter())
            .find(|re| re.is_match(command))
            .map(|re| {
                (
                    "suspicious_pattern",
                    format!("command matches a suspicious resource pattern: {}", re.as_str()),
                )
            })
    }

    fn check_off_hours(&self) -> Option<(&'static str, String)> {
        let hour = Local::now().hour() as u8;
        let (start, end) = self.working_hours;
        let within_hours = if start <= end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        };
        if within_hours {
            None
        } else {
            Some((
                "off_hours",
                format!("command issued outside working hours {start}:00-{end}:00"),
            ))
        }
    }

    fn check_high_rate(&self) -> Option<(&'static str, String)> {
        let since = Utc::now() - Duration::minutes(1);
        match self.store.count_commands_since(since) {
            Ok(count) if count as u32 > self.typical_commands_per_minute * 3 => Some((
                "high_rate",
                format!(
                    "{count} commands in the last minute, well above the typical rate of {}",
                    self.typical_commands_per_minute
                ),
            )),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("anomaly detector store error, failing open: {err:#}");
                None
            }
        }
    }
}

/// Process-local fallback used when no store is available: no rate or
/// global-learning-phase signal, just a baseline of command heads and
/// working directories seen during the learning window, flagging anything
/// unseen once that window has passed.
pub struct LocalAnomalyDetector {
    seen_heads: Mutex<HashSet<String>>,
    seen_cwds: Mutex<HashSet<String>>,
    command_count: Mutex<u32>,
    learning_commands: u32,
}

fn command_head(command: &str) -> String {
    command.split_whitespace().next().unwrap_or("").to_string()
}

impl LocalAnomalyDetector {
    pub fn new(learning_commands: u32) -> Self {
        Self {
            seen_heads: Mutex::new(HashSet::new()),
            seen_cwds: Mutex::new(HashSet::new()),
            command_count: Mutex::new(0),
            learning_commands,
        }
    }

    pub fn check(&self, command: &str, cwd: &str) -> Option<Violation> {
        let count = *self.command_count.lock().unwrap_or_else(|p| p.into_inner());
        if count < self.learning_commands {
            return None;
        }

        let head = command_head(command);
        let mut rules = Vec::new();
        let mut messages = Vec::new();

        if !self.seen_heads.lock().unwrap_or_else(|p| p.into_inner()).contains(&head) {
            rules.push("unseen_command_type");
            messages.push(format!("command type {head:?} has not been seen during the learning window"));
        }
        if !self.seen_cwds.lock().unwrap_or_else(|p| p.into_inner()).contains(cwd) {
            rules.push("unseen_working_dir");
            messages.push(format!("working directory {cwd:?} has not been seen during the learning window"));
        }

        if rules.is_empty() {
            None
        } else {
            Some(Violation::new(ViolationType::Anomaly, rules.join(","), messages.join("; ")))
        }
    }

    pub fn record(&self, command: &str, cwd: &str) {
        *self.command_count.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        self.seen_heads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(command_head(command));
        self.seen_cwds.lock().unwrap_or_else(|p| p.into_inner()).insert(cwd.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_store::{NewCommand, Store};

    fn seed_commands(store: &Store, n: usize) {
        for i in 0..n {
            store
                .record_command(&NewCommand {
                    session_id: None,
                    command: format!("cmd{i}"),
                    allowed: true,
                    risk_score: 1,
                    risk_level: "safe".into(),
                    risk_factors: vec![],
                    duration_ms: 1,
                    violations: vec![],
                })
                .unwrap();
        }
    }

    #[test]
    fn test_learning_phase_skips_all_checks() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 5);
        let detector = AnomalyDetector::new(&store, true, (0, 24), 1000, 50, &[], Action::Block);
        assert!(detector.check("cat /etc/shadow").is_none());
    }

    #[test]
    fn test_suspicious_pattern_flagged_after_learning_phase() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 60);
        let detector = AnomalyDetector::new(&store, true, (0, 24), 1000, 50, &[], Action::Block);
        let violation = detector.check("cat ~/.aws/credentials").unwrap();
        assert_eq!(violation.rule, "suspicious_pattern");
    }

    #[test]
    fn test_disabled_detector_never_flags() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 60);
        let detector = AnomalyDetector::new(&store, false, (0, 24), 1000, 50, &[], Action::Block);
        assert!(detector.check("cat /etc/shadow").is_none());
    }

    #[test]
    fn test_high_rate_flagged_when_far_above_typical() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 100);
        let detector = AnomalyDetector::new(&store, true, (0, 24), 1, 50, &[], Action::Block);
        let violation = detector.check("ls -la").unwrap();
        assert_eq!(violation.rule, "high_rate");
    }

    #[test]
    fn test_default_warn_action_suppresses_the_returned_violation() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 60);
        let detector = AnomalyDetector::new(&store, true, (0, 24), 1000, 50, &[], Action::Warn);
        assert!(detector.check("cat ~/.aws/credentials").is_none());
    }

    #[test]
    fn test_multiple_matching_dimensions_are_joined_into_one_violation() {
        let store = Store::open_in_memory().unwrap();
        seed_commands(&store, 100);
        let detector = AnomalyDetector::new(&store, true, (0, 24), 1, 50, &[], Action::Block);
        let violation = detector.check("cat ~/.aws/credentials").unwrap();
        assert!(violation.rule.contains("suspicious_pattern"));
        assert!(violation.rule.contains("high_rate"));
    }

    #[test]
    fn test_local_anomaly_detector_flags_unseen_command_after_learning() {
        let detector = LocalAnomalyDetector::new(2);
        detector.record("git status", "/repo");
        detector.record("git status", "/repo");
        assert!(detector.check("git status", "/repo").is_none());
        let violation = detector.check("curl http://example.com", "/repo").unwrap();
        assert_eq!(violation.rule, "unseen_command_type");
    }
}
