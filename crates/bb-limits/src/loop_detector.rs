//! C7: loop detector. Per-session: an exact repeat of the same normalized
//! command, or a run of near-identical commands above a similarity
//! threshold, within the last `window_size` commands.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use bb_config::Action;
use bb_core::{Violation, ViolationType};
use bb_store::CommandStore;

/// Normalize a command for repeat comparison: lowercase, strip quotes,
/// collapse whitespace, fold digit runs to `N` and long hex runs to `H` so
/// e.g. `rm file1.txt` and `rm file2.txt` compare equal.
pub fn normalize(command: &str) -> String {
    let lowered = command.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len());
    let chars: Vec<char> = collapsed.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_hexdigit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_hexdigit() {
                i += 1;
            }
            let run_len = i - start;
            let all_digits = chars[start..i].iter().all(|c| c.is_ascii_digit());
            if run_len >= 8 && !all_digits {
                out.push('H');
            } else if all_digits {
                out.push('N');
            } else {
                out.extend(&chars[start..i]);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn tokenize(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

pub struct LoopDetector<'a> {
    store: &'a dyn CommandStore,
    enabled: bool,
    max_repeats: u32,
    max_turns: u32,
    window_size: i64,
    similarity_threshold: f64,
    action: Action,
}

impl<'a> LoopDetector<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn CommandStore,
        enabled: bool,
        max_repeats: u32,
        max_turns: u32,
        window_size: usize,
        similarity_threshold: f64,
        action: Action,
    ) -> Self {
        Self {
            store,
            enabled,
            max_repeats,
            max_turns,
            window_size: window_size as i64,
            similarity_threshold,
            action,
        }
    }

    /// Warn-mode violations are logged and swallowed rather than returned,
    /// so a caller that only wires `check()`'s result into a deny decision
    /// never has to branch on `action` itself.
    fn apply_action(&self, violation: Violation) -> Option<Violation> {
        match self.action {
            Action::Block => Some(violation),
            Action::Warn => {
                tracing::warn!(rule = %violation.rule, message = %violation.message, "loop detector warning (not blocking)");
                None
            }
        }
    }

    pub fn check(&self, session_id: &str, command: &str) -> Option<Violation> {
        if !self.enabled {
            return None;
        }

        match self.store.session_command_count(session_id) {
            Ok(count) if count + 1 >= self.max_turns as i64 => {
                return self.apply_action(Violation::new(
                    ViolationType::Loop,
                    "max_turns",
                    format!("session has reached {} commands, at or above the configured maximum of {}", count + 1, self.max_turns),
                ));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("loop detector store error, failing open: {err:#}");
                return None;
            }
        }

        let recent = match self
            .store
            .recent_commands_for_session(session_id, self.window_size)
        {
            Ok(recent) => recent,
            Err(err) => {
                tracing::warn!("loop detector store error, failing open: {err:#}");
                return None;
            }
        };
        let normalized_current = normalize(command);

        let exact_repeats = recent
            .iter()
            .filter(|c| normalize(c) == normalized_current)
            .count() as u32;
        if exact_repeats + 1 >= self.max_repeats {
            return self.apply_action(Violation::new(
                ViolationType::Loop,
                "exact_repeat",
                format!("command repeated {} times in the recent window", exact_repeats + 1),
            ));
        }

        let similar_repeats = recent
            .iter()
            .filter(|c| {
                let n = normalize(c);
                n != normalized_current && jaccard(&n, &normalized_current) >= self.similarity_threshold
            })
            .count() as u32;
        if similar_repeats + 1 >= self.max_repeats {
            return self.apply_action(Violation::new(
                ViolationType::Loop,
                "semantic_repeat",
                format!(
                    "{} near-identical commands in the recent window",
                    similar_repeats + 1
                ),
            ));
        }

        None
    }
}

/// Process-local fallback tracking the last N normalized commands per
/// process (single-session use, e.g. when no store is available).
pub struct LocalLoopDetector {
    recent: Mutex<VecDeque<String>>,
    max_repeats: u32,
    window_size: usize,
    similarity_threshold: f64,
}

impl LocalLoopDetector {
    pub fn new(max_repeats: u32, window_size: usize, similarity_threshold: f64) -> Self {
        Self {
            recent: Mutex::new(VecDeque::new()),
            max_repeats,
            window_size,
            similarity_threshold,
        }
    }

    pub fn check(&self, command: &str) -> Option<Violation> {
        let recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
        let normalized_current = normalize(command);
        let exact_repeats = recent.iter().filter(|c| **c == normalized_current).count() as u32;
        if exact_repeats + 1 >= self.max_repeats {
            return Some(Violation::new(
                ViolationType::Loop,
                "exact_repeat",
                format!("command repeated {} times in the recent window", exact_repeats + 1),
            ));
        }
        let similar_repeats = recent
            .iter()
            .filter(|c| {
                *c != &normalized_current && jaccard(c, &normalized_current) >= self.similarity_threshold
            })
            .count() as u32;
        if similar_repeats + 1 >= self.max_repeats {
            return Some(Violation::new(
                ViolationType::Loop,
                "semantic_repeat",
                format!(
                    "{} near-identical commands in the recent window",
                    similar_repeats + 1
                ),
            ));
        }
        None
    }

    pub fn record(&self, command: &str) {
        let mut recent = self.recent.lock().unwrap_or_else(|p| p.into_inner());
        recent.push_back(normalize(command));
        while recent.len() > self.window_size {
            recent.pop_front();
        }
    }
}
