pub mod config;
pub mod paths;

pub use config::{
    Action, AnomalyDetectionConfig, AuditConfig, CommandsConfig, Config, Destination,
    LoopDetectionConfig, PathsConfig, Profile, RateLimitConfig, RiskPatternConfig,
    RiskScoringConfig, SecretsConfig,
};
