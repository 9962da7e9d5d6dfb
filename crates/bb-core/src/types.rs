use serde::{Deserialize, Serialize};

/// Risk level bucket assigned to a numeric 1-10 risk score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Caution,
    Dangerous,
    Critical,
}

impl RiskLevel {
    /// Buckets: 1-3 safe, 4-5 caution, 6-8 dangerous, 9-10 critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=3 => RiskLevel::Safe,
            4..=5 => RiskLevel::Caution,
            6..=8 => RiskLevel::Dangerous,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::Dangerous => "dangerous",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity attached to a violation or secrets-guard finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Which check produced a violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Command,
    Path,
    Secrets,
    RateLimit,
    Loop,
    Anomaly,
    Risk,
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ViolationType::Command => "command",
            ViolationType::Path => "path",
            ViolationType::Secrets => "secrets",
            ViolationType::RateLimit => "rate_limit",
            ViolationType::Loop => "loop",
            ViolationType::Anomaly => "anomaly",
            ViolationType::Risk => "risk",
        };
        write!(f, "{s}")
    }
}

/// A structured deny reason from a policy check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub rule: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl Violation {
    pub fn new(
        violation_type: ViolationType,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            rule: rule.into(),
            message: message.into(),
            remediation: None,
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_remediation(mut self, remediation: Vec<String>) -> Self {
        self.remediation = Some(remediation);
        self
    }
}

/// `{score:1..10, level, factors[]}` produced by the risk scorer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RiskScore {
    pub score: u8,
    pub level: Option<RiskLevel>,
    pub factors: Vec<String>,
}

impl RiskScore {
    pub fn new(score: u8, factors: Vec<String>) -> Self {
        Self {
            score,
            level: Some(RiskLevel::from_score(score)),
            factors,
        }
    }
}

/// Decision shape for a single gate call: `Allow{riskScore} | Deny{violation, riskScore}`.
#[derive(Clone, Debug)]
pub enum Decision {
    Allow { risk_score: u8 },
    Deny { violation: Violation, risk_score: u8 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn risk_score(&self) -> u8 {
        match self {
            Decision::Allow { risk_score } => *risk_score,
            Decision::Deny { risk_score, .. } => *risk_score,
        }
    }
}

/// Normalized tool input. The pipeline never inspects raw JSON shapes past this
/// boundary.
#[derive(Clone, Debug)]
pub enum ToolInput {
    Bash { cmd: String },
    ShellLike { command: String },
    Other { raw: Vec<u8> },
}

impl ToolInput {
    /// The command text a shell-oriented check should run against, if any.
    pub fn as_command_text(&self) -> Option<&str> {
        match self {
            ToolInput::Bash { cmd } => Some(cmd),
            ToolInput::ShellLike { command } => Some(command),
            ToolInput::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_buckets_cover_1_to_10_without_overlap() {
        let expected = [
            (1, RiskLevel::Safe),
            (2, RiskLevel::Safe),
            (3, RiskLevel::Safe),
            (4, RiskLevel::Caution),
            (5, RiskLevel::Caution),
            (6, RiskLevel::Dangerous),
            (7, RiskLevel::Dangerous),
            (8, RiskLevel::Dangerous),
            (9, RiskLevel::Critical),
            (10, RiskLevel::Critical),
        ];
        for (score, level) in expected {
            assert_eq!(RiskLevel::from_score(score), level, "score {score}");
        }
    }

    #[test]
    fn test_violation_serde_round_trip() {
        let v = Violation::new(ViolationType::Command, "block:rm -rf /", "blocked")
            .with_severity(Severity::Critical);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"type\":\"command\""));
        let back: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rule, "block:rm -rf /");
        assert_eq!(back.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_decision_risk_score_accessor() {
        let allow = Decision::Allow { risk_score: 2 };
        assert!(allow.is_allowed());
        assert_eq!(allow.risk_score(), 2);

        let deny = Decision::Deny {
            violation: Violation::new(ViolationType::Risk, "risk_threshold", "too risky"),
            risk_score: 9,
        };
        assert!(!deny.is_allowed());
        assert_eq!(deny.risk_score(), 9);
    }

    #[test]
    fn test_tool_input_command_text() {
        let bash = ToolInput::Bash {
            cmd: "ls -la".into(),
        };
        assert_eq!(bash.as_command_text(), Some("ls -la"));

        let other = ToolInput::Other { raw: vec![0, 1] };
        assert_eq!(other.as_command_text(), None);
    }
}
