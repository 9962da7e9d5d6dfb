//! C5: risk scorer. Takes the max weight across every built-in (and
//! config-supplied) pattern that matches a command, and buckets it via
//! `RiskLevel::from_score`.

use std::sync::OnceLock;

use bb_core::RiskScore;
use regex::Regex;

struct WeightedPattern {
    label: &'static str,
    weight: u8,
    regex: Regex,
}

fn builtin_patterns() -> &'static [WeightedPattern] {
    static PATTERNS: OnceLock<Vec<WeightedPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let specs: &[(&str, u8, &str)] = &[
            ("Recursive delete of a root-ish path", 9, r"(?i)\brm\s+-[a-z]*r[a-z]*f?[a-z]*\s+(/|~|\.|\*)\b"),
            ("Remote code execution", 10, r"(?i)\b(curl|wget)\b[^|;&]*\|\s*(sudo\s+)?(ba)?sh\b"),
            ("World-writable permission change", 7, r"chmod\s+(-R\s+)?0?777\b"),
            ("Privilege escalation", 6, r"(?i)\b(sudo su|sudo -i|sudo -s|pkexec)\b"),
            ("Direct block device access", 10, r"(?i)\b(dd\s+if=|mkfs\.?\w*|>\s*/dev/sd[a-z])"),
            ("Fork bomb", 10, r":\(\)\s*\{\s*:\|\s*:\s*&\s*\}\s*;\s*:"),
            ("Passwd file reference", 5, r"/etc/passwd\b"),
            ("Shadow file reference", 8, r"/etc/shadow\b"),
            ("Credential directory reference", 6, r"(?i)(~|\$HOME)?/\.(ssh|aws|gnupg|kube)\b"),
            (".env file reference", 5, r"\.env\b"),
            ("Base64 decode", 4, r"(?i)base64\s+(-d|--decode)\b"),
            ("Dynamic code evaluation", 6, r"(?i)\beval\b"),
        ];
        specs
            .iter()
            .filter_map(|(label, weight, pattern)| {
                Regex::new(pattern).ok().map(|regex| WeightedPattern {
                    label,
                    weight: *weight,
                    regex,
                })
            })
            .collect()
    })
}

pub struct RiskScorer {
    extra: Vec<WeightedPattern>,
}

impl RiskScorer {
    pub fn new(additional: &[(String, u8, String)]) -> Self {
        let extra = additional
            .iter()
            .filter_map(|(label, weight, pattern)| {
                Regex::new(pattern).ok().map(|regex| WeightedPattern {
                    label: Box::leak(label.clone().into_boxed_str()),
                    weight: *weight,
                    regex,
                })
            })
            .collect();
        Self { extra }
    }

    pub fn score(&self, command: &str) -> RiskScore {
        let mut max_weight: u8 = 0;
        let mut factors = Vec::new();
        for pattern in builtin_patterns().iter().chain(self.extra.iter()) {
            if pattern.regex.is_match(command) {
                max_weight = max_weight.max(pattern.weight);
                factors.push(pattern.label.to_string());
            }
        }
        let score = if factors.is_empty() { 0 } else { max_weight.max(1) };
        RiskScore::new(score, factors)
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(&[])
    }
}
