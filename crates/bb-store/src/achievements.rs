//! Read-model derived from store state: achievement badges and an XP score.
//! Owns no primary state of its own, only summarizes command/prompt counts.

use serde::{Deserialize, Serialize};

use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementStats {
    pub total_commands: i64,
    pub total_blocked: i64,
    pub total_prompts: i64,
    pub total_sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub key: String,
    pub tier: Tier,
}

impl Store {
    pub fn get_achievement_stats(&self) -> anyhow::Result<AchievementStats> {
        let total_commands = self.get_total_command_count()?;
        let prompt_stats = self.get_user_prompt_stats()?;
        let sessions = self.get_sessions(None, i64::MAX)?;
        let total_blocked: i64 = sessions.iter().map(|s| s.blocked_count).sum();
        Ok(AchievementStats {
            total_commands,
            total_blocked,
            total_prompts: prompt_stats.total_prompts,
            total_sessions: sessions.len() as i64,
        })
    }
}

/// Tiered badges keyed by count thresholds. Thresholds are deliberately
/// coarse; this is a read-model for fun, not a precision gauge.
pub fn compute_achievements(stats: &AchievementStats) -> Vec<Achievement> {
    let mut badges = Vec::new();

    if let Some(tier) = tier_for(stats.total_prompts, 1, 25, 100) {
        badges.push(Achievement {
            key: "conversationalist".into(),
            tier,
        });
    }
    if let Some(tier) = tier_for(stats.total_commands, 10, 200, 1000) {
        badges.push(Achievement {
            key: "operator".into(),
            tier,
        });
    }
    if let Some(tier) = tier_for(stats.total_blocked, 1, 10, 50) {
        badges.push(Achievement {
            key: "close-call".into(),
            tier,
        });
    }
    if let Some(tier) = tier_for(stats.total_sessions, 1, 10, 50) {
        badges.push(Achievement {
            key: "regular".into(),
            tier,
        });
    }

    badges
}

fn tier_for(value: i64, bronze: i64, silver: i64, gold: i64) -> Option<Tier> {
    if value >= gold {
        Some(Tier::Gold)
    } else if value >= silver {
        Some(Tier::Silver)
    } else if value >= bronze {
        Some(Tier::Bronze)
    } else {
        None
    }
}

/// A simple point total: commands are worth 1 XP, prompts 2 XP, each badge
/// tier worth a flat bonus.
pub fn compute_xp(stats: &AchievementStats, badges: &[Achievement]) -> u64 {
    let base = stats.total_commands.max(0) as u64 + stats.total_prompts.max(0) as u64 * 2;
    let bonus: u64 = badges
        .iter()
        .map(|b| match b.tier {
            Tier::Bronze => 50,
            Tier::Silver => 150,
            Tier::Gold => 500,
        })
        .sum();
    base + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_thresholds() {
        assert_eq!(tier_for(0, 1, 25, 100), None);
        assert_eq!(tier_for(1, 1, 25, 100), Some(Tier::Bronze));
        assert_eq!(tier_for(25, 1, 25, 100), Some(Tier::Silver));
        assert_eq!(tier_for(100, 1, 25, 100), Some(Tier::Gold));
    }

    #[test]
    fn test_compute_achievements_empty_stats_yields_no_badges() {
        let stats = AchievementStats::default();
        assert!(compute_achievements(&stats).is_empty());
    }

    #[test]
    fn test_compute_achievements_awards_conversationalist() {
        let stats = AchievementStats {
            total_prompts: 1,
            ..Default::default()
        };
        let badges = compute_achievements(&stats);
        assert!(badges.iter().any(|b| b.key == "conversationalist"));
    }

    #[test]
    fn test_compute_xp_includes_badge_bonus() {
        let stats = AchievementStats {
            total_commands: 10,
            total_prompts: 1,
            ..Default::default()
        };
        let badges = compute_achievements(&stats);
        let xp = compute_xp(&stats, &badges);
        assert!(xp >= 10 + 2);
    }

    #[test]
    fn test_get_achievement_stats_reflects_store() {
        let store = Store::open_in_memory().unwrap();
        let session_id = store.insert_session("agent", 1, "/tmp", None).unwrap();
        store
            .update_session(
                &session_id,
                &crate::store::SessionUpdate {
                    blocked_count: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        let stats = store.get_achievement_stats().unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_blocked, 2);
    }
}
