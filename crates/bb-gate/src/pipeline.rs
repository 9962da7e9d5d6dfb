//! C13: gate entry point. Two distinct data flows, per spec §2:
//!
//! - **gate** (pre-execution): `run_gate` loads config, runs the full C9
//!   policy engine (C2-C8 plus the static checks) to a decision, appends an
//!   audit entry, and records the command against the store/session. A
//!   store or audit failure here is logged and never flips the decision
//!   (fail-open).
//! - **record** (post-execution, no decision): `record_executed` only
//!   scores and inserts the already-run command into the store; it never
//!   consults the command filter, path sandbox, secrets guard, or the
//!   store-backed limits, and it writes no audit-log line.

use std::path::Path;
use std::time::Instant;

use bb_audit::{AuditLogger, Destination as AuditDestination};
use bb_config::{Config, Destination as ConfigDestination};
use bb_core::{Decision, Violation};
use bb_limits::{AnomalyDetector, LoopDetector, RateLimiter};
use bb_policy::{Evaluation, ExtraCheck, PolicyEngine, RiskScorer};
use bb_session::SessionManager;
use bb_store::{CommandStore, Store};

pub struct GateOutcome {
    pub decision: Decision,
    pub violations: Vec<Violation>,
    pub duration_ms: u64,
}

pub struct RecordOutcome {
    pub risk_score: u8,
    pub duration_ms: u64,
}

fn to_audit_destination(destination: ConfigDestination) -> AuditDestination {
    match destination {
        ConfigDestination::Local => AuditDestination::Local,
        ConfigDestination::Remote => AuditDestination::Remote,
        ConfigDestination::Both => AuditDestination::Both,
    }
}

fn open_store() -> Option<Store> {
    let path = bb_config::paths::store_path().or_else(|| {
        let err = bb_core::BbError::Misconfiguration("could not resolve the home directory for the store path".to_string());
        tracing::warn!("{err}");
        None
    })?;
    match Store::open(&path) {
        Ok(store) => Some(store),
        Err(err) => {
            let err = bb_core::BbError::StoreUnavailable(err.to_string());
            tracing::warn!("{err}, continuing store-unavailable");
            None
        }
    }
}

fn build_audit_logger(config: &Config) -> Option<AuditLogger> {
    let log_path = bb_config::paths::audit_log_path().or_else(|| {
        let err = bb_core::BbError::AuditUnavailable("could not resolve the home directory for the audit log path".to_string());
        tracing::warn!("{err}");
        None
    })?;
    let lock_path = bb_config::paths::audit_lock_path().or_else(|| {
        let err = bb_core::BbError::AuditUnavailable("could not resolve the home directory for the audit lock path".to_string());
        tracing::warn!("{err}");
        None
    })?;
    Some(AuditLogger::new(
        log_path,
        lock_path,
        config.audit.enable,
        to_audit_destination(config.audit.destination),
        config.audit.remote_url.clone(),
    ))
}

/// Evaluate one proposed command against the full policy engine and record
/// the decision. This is what the `gate` subcommand calls.
pub fn run_gate(project_root: &Path, command: &str) -> GateOutcome {
    let started = Instant::now();
    let config = bb_config::config::load(project_root);
    let engine = PolicyEngine::from_config(&config);
    let store = open_store();

    let session_id = store
        .as_ref()
        .and_then(|s| bb_session::find_running_session(s, config.agent.as_deref()).ok().flatten())
        .map(|s| s.id);

    let rate_limiter = store.as_ref().map(|s| {
        RateLimiter::new(
            s,
            config.rate_limit.enable,
            config.rate_limit.max_per_minute,
            config.rate_limit.max_per_hour,
        )
    });
    let loop_detector = store.as_ref().map(|s| {
        LoopDetector::new(
            s,
            config.loop_detection.enable,
            config.loop_detection.max_repeats,
            config.loop_detection.max_turns,
            config.loop_detection.window_size,
            config.loop_detection.similarity_threshold,
            config.loop_detection.action,
        )
    });
    let anomaly_detector = store.as_ref().map(|s| {
        AnomalyDetector::new(
            s,
            config.anomaly_detection.enable,
            config.anomaly_detection.working_hours,
            config.anomaly_detection.typical_commands_per_minute,
            config.anomaly_detection.learning_commands,
            &config.anomaly_detection.additional_patterns,
            config.anomaly_detection.action,
        )
    });

    let mut extra_checks: Vec<ExtraCheck> = Vec::new();
    if let Some(limiter) = &rate_limiter {
        extra_checks.push(Box::new(move |_cmd: &str| limiter.check()));
    }
    if let (Some(detector), Some(session_id)) = (&loop_detector, &session_id) {
        extra_checks.push(Box::new(move |cmd: &str| detector.check(session_id, cmd)));
    }
    if let Some(detector) = &anomaly_detector {
        extra_checks.push(Box::new(move |cmd: &str| detector.check(cmd)));
    }

    let Evaluation {
        violations,
        risk_score,
        risk_level,
    } = engine.evaluate(command, &extra_checks);

    let decision = if let Some(first) = violations.first() {
        Decision::Deny {
            violation: first.clone(),
            risk_score,
        }
    } else {
        Decision::Allow { risk_score }
    };

    let duration_ms = started.elapsed().as_millis() as u64;

    if let Some(logger) = build_audit_logger(&config) {
        logger.record(
            command,
            decision.is_allowed(),
            &violations,
            duration_ms,
            config.agent.as_deref(),
        );
    }

    if let Some(store) = &store {
        let factors: Vec<String> = violations.iter().map(|v| v.message.clone()).collect();
        let manager = match &session_id {
            Some(id) => SessionManager::attach(store, id),
            None => Ok(SessionManager::new(store)),
        };
        match manager {
            Ok(manager) => {
                if let Err(err) = manager.record(
                    command,
                    decision.is_allowed(),
                    risk_score,
                    &risk_level.to_string(),
                    factors,
                    &violations,
                    duration_ms as i64,
                ) {
                    tracing::warn!("failed to persist command record, decision unaffected: {err:#}");
                } else if let Err(err) = manager.flush_now() {
                    tracing::warn!("failed to flush session counters: {err:#}");
                }
            }
            Err(err) => tracing::warn!("failed to attach to session, recording detached: {err:#}"),
        }
    }

    GateOutcome {
        decision,
        violations,
        duration_ms,
    }
}

/// Record a command that already ran. Scores it for the stored record but
/// never denies: the decision to run it was already made elsewhere.
pub fn record_executed(project_root: &Path, command: &str, _output: &str) -> RecordOutcome {
    let started = Instant::now();
    let config = bb_config::config::load(project_root);
    let additional_risk_patterns: Vec<(String, u8, String)> = config
        .risk_scoring
        .additional_patterns
        .iter()
        .map(|p| (p.label.clone(), p.score, p.pattern.clone()))
        .collect();
    let risk = RiskScorer::new(&additional_risk_patterns).score(command);
    let duration_ms = started.elapsed().as_millis() as u64;

    if let Some(store) = open_store() {
        let session_id = bb_session::find_running_session(&store, config.agent.as_deref())
            .ok()
            .flatten()
            .map(|s| s.id);
        let manager = match &session_id {
            Some(id) => SessionManager::attach(&store, id),
            None => Ok(SessionManager::new(&store)),
        };
        match manager {
            Ok(manager) => {
                let result = manager.record(
                    command,
                    true,
                    risk.score,
                    &risk.level.unwrap_or(bb_core::RiskLevel::Safe).to_string(),
                    risk.factors.clone(),
                    &[],
                    duration_ms as i64,
                );
                if let Err(err) = result {
                    tracing::warn!("failed to persist recorded command: {err:#}");
                } else if let Err(err) = manager.flush_now() {
                    tracing::warn!("failed to flush session counters: {err:#}");
                }
            }
            Err(err) => tracing::warn!("failed to attach to session, recording detached: {err:#}"),
        }
    }

    RecordOutcome {
        risk_score: risk.score,
        duration_ms,
    }
}
