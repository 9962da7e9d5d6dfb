//! C9: policy engine. Runs the static checks (command filter, path sandbox,
//! secrets guard, risk scorer) in a fixed order and collects every
//! violation rather than short-circuiting on the first one, per the
//! aggregate-by-value design: a `Policy` is plain data, not an inheritance
//! hierarchy.
//!
//! Rate limiting, loop detection, and anomaly detection (C6-C8) are
//! store-backed and live in a separate crate; callers that want them in the
//! pipeline pass them in as extra checks so this crate never has to depend
//! on the store.

use bb_core::{Decision, RiskLevel, Violation};
use bb_config::Config;

use crate::command_filter::CommandFilter;
use crate::path_sandbox::{extract_path_tokens, PathSandbox};
use crate::risk::RiskScorer;
use crate::secrets::SecretsGuard;

/// An additional check run after the static policy checks, e.g. a
/// store-backed rate limiter or loop detector. Returns `Some(violation)` to
/// flag the command.
pub type ExtraCheck<'a> = Box<dyn Fn(&str) -> Option<Violation> + 'a>;

pub struct PolicyEngine {
    command_filter: CommandFilter,
    path_sandbox: PathSandbox,
    secrets_guard: SecretsGuard,
    risk_scorer: RiskScorer,
    warn_threshold: u8,
    block_threshold: u8,
}

/// The full result of evaluating one command: every violation found, plus
/// the risk score that was computed regardless of outcome.
pub struct Evaluation {
    pub violations: Vec<Violation>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
}

impl Evaluation {
    /// Collapse to the single decision the gate entry point returns: the
    /// first violation wins as the reported reason, but the full set is
    /// still available for audit logging.
    pub fn decision(&self) -> Decision {
        match self.violations.first() {
            Some(violation) => Decision::Deny {
                violation: violation.clone(),
                risk_score: self.risk_score,
            },
            None => Decision::Allow {
                risk_score: self.risk_score,
            },
        }
    }
}

impl PolicyEngine {
    pub fn from_config(config: &Config) -> Self {
        let additional_risk_patterns: Vec<(String, u8, String)> = config
            .risk_scoring
            .additional_patterns
            .iter()
            .map(|p| (p.label.clone(), p.score, p.pattern.clone()))
            .collect();
        Self {
            command_filter: CommandFilter::new(&config.commands.allow, &config.commands.block),
            path_sandbox: PathSandbox::new(&config.paths.allow, &config.paths.block),
            secrets_guard: SecretsGuard::new(config.secrets.enable, &config.secrets.patterns),
            risk_scorer: RiskScorer::new(&additional_risk_patterns),
            warn_threshold: config.risk_scoring.warn_threshold,
            block_threshold: config.risk_scoring.block_threshold,
        }
    }

    /// Evaluate a command against the static checks plus any extra checks
    /// supplied by the caller, in order: command filter, secrets guard,
    /// path sandbox, risk scorer, then the extras.
    pub fn evaluate(&self, command: &str, extra_checks: &[ExtraCheck<'_>]) -> Evaluation {
        let mut violations = Vec::new();

        if let Some(v) = self.command_filter.check(command) {
            violations.push(v);
        }
        let path_tokens = extract_path_tokens(command);
        if let Some(v) = self.secrets_guard.check_command(command, &path_tokens) {
            violations.push(v);
        }
        if let Some(v) = self.path_sandbox.check_command(command) {
            violations.push(v);
        }

        let risk_score = self.risk_scorer.score(command);
        let risk_level = risk_score.level.unwrap_or(RiskLevel::Safe);

        if risk_score.score >= self.block_threshold {
            violations.push(bb_core::Violation::new(
                bb_core::ViolationType::Risk,
                "risk_threshold_block",
                format!(
                    "risk score {} meets or exceeds the block threshold {}",
                    risk_score.score, self.block_threshold
                ),
            ));
        } else if risk_score.score >= self.warn_threshold {
            tracing::warn!(
                score = risk_score.score,
                "command risk score meets warn threshold: {command}"
            );
        }

        for check in extra_checks {
            if let Some(v) = check(command) {
                violations.push(v);
            }
        }

        Evaluation {
            violations,
            risk_score: risk_score.score,
            risk_level,
        }
    }
}
