//! C6: rate limiter. Counts are global across sessions, not per-session,
//! per the stated contract: a burst from any combination of sessions trips
//! the same limit.

use std::collections::VecDeque;
use std::sync::Mutex;

use bb_core::{Violation, ViolationType};
use bb_store::CommandStore;
use chrono::{DateTime, Duration, Utc};

pub struct RateLimiter<'a> {
    store: &'a dyn CommandStore,
    enabled: bool,
    max_per_minute: u32,
    max_per_hour: u32,
}

impl<'a> RateLimiter<'a> {
    pub fn new(store: &'a dyn CommandStore, enabled: bool, max_per_minute: u32, max_per_hour: u32) -> Self {
        Self {
            store,
            enabled,
            max_per_minute,
            max_per_hour,
        }
    }

    /// Counts commands already recorded in the window; a store error fails
    /// open (allowed, with a warning logged) rather than blocking traffic.
    pub fn check(&self) -> Option<Violation> {
        if !self.enabled {
            return None;
        }
        let now = Utc::now();
        match self.store.count_commands_since(now - Duration::minutes(1)) {
            Ok(count) if count as u32 >= self.max_per_minute => {
                return Some(Violation::new(
                    ViolationType::RateLimit,
                    "rate_per_minute",
                    format!("more than {} commands in the last minute", self.max_per_minute),
                ));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("rate limiter store error, failing open: {err:#}");
                return None;
            }
        }
        match self.store.count_commands_since(now - Duration::hours(1)) {
            Ok(count) if count as u32 >= self.max_per_hour => Some(Violation::new(
                ViolationType::RateLimit,
                "rate_per_hour",
                format!("more than {} commands in the last hour", self.max_per_hour),
            )),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("rate limiter store error, failing open: {err:#}");
                None
            }
        }
    }
}

/// Process-local fallback used when the store is unavailable. Keeps its own
/// rolling window of timestamps; callers must call `record` after an allow.
pub struct LocalRateLimiter {
    timestamps: Mutex<VecDeque<DateTime<Utc>>>,
    max_per_minute: u32,
    max_per_hour: u32,
}

impl LocalRateLimiter {
    pub fn new(max_per_minute: u32, max_per_hour: u32) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::new()),
            max_per_minute,
            max_per_hour,
        }
    }

    pub fn check(&self) -> Option<Violation> {
        let now = Utc::now();
        let timestamps = self.timestamps.lock().unwrap_or_else(|p| p.into_inner());
        let last_minute = timestamps.iter().filter(|ts| now - **ts < Duration::minutes(1)).count();
        if last_minute as u32 >= self.max_per_minute {
            return Some(Violation::new(
                ViolationType::RateLimit,
                "rate_per_minute",
                format!("more than {} commands in the last minute", self.max_per_minute),
            ));
        }
        let last_hour = timestamps.iter().filter(|ts| now - **ts < Duration::hours(1)).count();
        if last_hour as u32 >= self.max_per_hour {
            return Some(Violation::new(
                ViolationType::RateLimit,
                "rate_per_hour",
                format!("more than {} commands in the last hour", self.max_per_hour),
            ));
        }
        None
    }

    pub fn record(&self) {
        let now = Utc::now();
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|p| p.into_inner());
        timestamps.push_back(now);
        while let Some(front) = timestamps.front() {
            if now - *front > Duration::hours(1) {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_store::{NewCommand, Store};

    fn fresh_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_allows_when_under_threshold() {
        let store = fresh_store();
        let limiter = RateLimiter::new(&store, true, 100, 1000);
        assert!(limiter.check().is_none());
    }

    #[test]
    fn test_blocks_the_101st_command_with_max_100_per_minute() {
        let store = fresh_store();
        for i in 0..100 {
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
        let limiter = RateLimiter::new(&store, true, 100, 1000);
        let violation = limiter.check().unwrap();
        assert_eq!(violation.rule, "rate_per_minute");
    }

    #[test]
    fn test_disabled_limiter_never_blocks() {
        let store = fresh_store();
        for i in 0..200 {
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
        let limiter = RateLimiter::new(&store, false, 100, 1000);
        assert!(limiter.check().is_none());
    }

    #[test]
    fn test_local_rate_limiter_tracks_its_own_window() {
        let limiter = LocalRateLimiter::new(2, 100);
        assert!(limiter.check().is_none());
        limiter.record();
        assert!(limiter.check().is_none());
        limiter.record();
        assert!(limiter.check().is_some());
    }
}
