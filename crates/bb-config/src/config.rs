use serde::{Deserialize, Serialize};

/// Enforcement strictness shipped with the three built-in profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Strict,
    #[default]
    Balanced,
    Permissive,
}

impl Profile {
    fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Some(Profile::Strict),
            "balanced" => Some(Profile::Balanced),
            "permissive" => Some(Profile::Permissive),
            _ => None,
        }
    }
}

/// Action a detector takes once its threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Warn,
    Block,
}

/// Where audit entries are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    Local,
    Remote,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub block: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub block: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub mode: Action,
    /// Additional user-supplied secret-file glob patterns (beyond the
    /// built-in `.env`/`.pem`/`id_rsa`/... set).
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            mode: Action::Block,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enable: true,
            destination: Destination::Local,
            remote_url: None,
        }
    }
}

fn default_max_per_minute() -> u32 {
    60
}

fn default_max_per_hour() -> u32 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: u32,
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

/// One extra risk-scoring pattern contributed by config, atop the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPatternConfig {
    pub pattern: String,
    pub score: u8,
    pub label: String,
}

fn default_warn_threshold() -> u8 {
    6
}

fn default_block_threshold() -> u8 {
    9
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScoringConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: u8,
    #[serde(default = "default_block_threshold")]
    pub block_threshold: u8,
    #[serde(default)]
    pub additional_patterns: Vec<RiskPatternConfig>,
}

impl Default for RiskScoringConfig {
    fn default() -> Self {
        Self {
            enable: true,
            warn_threshold: default_warn_threshold(),
            block_threshold: default_block_threshold(),
            additional_patterns: Vec::new(),
        }
    }
}

fn default_max_repeats() -> u32 {
    3
}

fn default_max_turns() -> u32 {
    200
}

fn default_window_size() -> usize {
    10
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_cooldown_ms() -> u64 {
    0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopDetectionConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_max_repeats")]
    pub max_repeats: u32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub action: Action,
}

impl Default for LoopDetectionConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_repeats: default_max_repeats(),
            max_turns: default_max_turns(),
            window_size: default_window_size(),
            similarity_threshold: default_similarity_threshold(),
            cooldown_ms: default_cooldown_ms(),
            action: Action::Block,
        }
    }
}

fn default_working_hours() -> (u8, u8) {
    (7, 22)
}

fn default_typical_commands_per_minute() -> u32 {
    10
}

fn default_learning_commands() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyDetectionConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_working_hours")]
    pub working_hours: (u8, u8),
    #[serde(default = "default_typical_commands_per_minute")]
    pub typical_commands_per_minute: u32,
    #[serde(default = "default_learning_commands")]
    pub learning_commands: u32,
    /// Additional regex sources layered on top of the built-in suspicious set.
    #[serde(default)]
    pub additional_patterns: Vec<String>,
    #[serde(default)]
    pub action: Action,
}

impl Default for AnomalyDetectionConfig {
    fn default() -> Self {
        Self {
            enable: true,
            working_hours: default_working_hours(),
            typical_commands_per_minute: default_typical_commands_per_minute(),
            learning_commands: default_learning_commands(),
            additional_patterns: Vec::new(),
            action: Action::Warn,
        }
    }
}

/// Process-wide, immutable-after-load config tree. Every sub-config has
/// defaults; `Config::load` always returns a fully populated value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default, rename = "rateLimit")]
    pub rate_limit: RateLimitConfig,
    #[serde(default, rename = "riskScoring")]
    pub risk_scoring: RiskScoringConfig,
    #[serde(default, rename = "loopDetection")]
    pub loop_detection: LoopDetectionConfig,
    #[serde(default, rename = "anomalyDetection")]
    pub anomaly_detection: AnomalyDetectionConfig,
}

const DANGEROUS_BLOCK_LIST: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "rm -rf .",
    ":(){:|:&};:",
    "dd if=* of=/dev/*",
    "mkfs*",
    "chmod -R 777 /",
    "chmod 777 /",
    "curl * | bash",
    "curl * | sh",
    "wget * | bash",
    "wget * | sh",
    "> /dev/sda",
];

const BALANCED_ALLOW_LIST: &[&str] = &[
    "ls *", "ls", "pwd", "cat *", "echo *", "git *", "npm *", "node *", "python *", "python3 *",
    "pip *", "pip3 *", "grep *", "find *", "which *", "vim *", "nano *", "code *",
];

impl Config {
    /// Build the default config for a given profile: every profile ships the
    /// same block list, but allow lists differ per §6.
    pub fn default_for_profile(profile: Profile) -> Self {
        let allow = match profile {
            Profile::Strict => Vec::new(),
            Profile::Balanced => BALANCED_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
            Profile::Permissive => vec!["*".to_string()],
        };
        Self {
            profile,
            agent: None,
            commands: CommandsConfig {
                allow,
                block: DANGEROUS_BLOCK_LIST.iter().map(|s| s.to_string()).collect(),
            },
            paths: PathsConfig::default_paths(),
            secrets: SecretsConfig::default(),
            audit: AuditConfig::default(),
            rate_limit: RateLimitConfig::default(),
            risk_scoring: RiskScoringConfig::default(),
            loop_detection: LoopDetectionConfig::default(),
            anomaly_detection: AnomalyDetectionConfig::default(),
        }
    }
}

impl PathsConfig {
    fn default_paths() -> Self {
        Self {
            allow: vec!["*".to_string()],
            block: vec![
                "/etc/shadow".to_string(),
                "/etc/sudoers".to_string(),
                "~/.ssh".to_string(),
                "~/.aws".to_string(),
                "~/.gnupg".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_for_profile(Profile::default())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

/// Deep merge two YAML mappings. Overlay wins on scalars; mappings merge
/// key by key so a partial user file only overrides what it names.
fn merge_yaml_values(base: serde_yaml::Value, overlay: serde_yaml::Value) -> serde_yaml::Value {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(mut base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged_val = match base_map.remove(&key) {
                    Some(base_val) => merge_yaml_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged_val);
            }
            serde_yaml::Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

fn overlay_profile(overlay: &serde_yaml::Value) -> Profile {
    overlay
        .get("profile")
        .and_then(|v| v.as_str())
        .and_then(Profile::from_str_loose)
        .unwrap_or_default()
}

/// Load config from the search path rooted at `project_root`. Missing file,
/// unparseable YAML, or an unreadable home directory all fall back to
/// profile defaults rather than failing the gate.
pub fn load(project_root: &std::path::Path) -> Config {
    match try_load(project_root) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("failed to load config, using defaults: {err:#}");
            Config::default()
        }
    }
}

fn try_load(project_root: &std::path::Path) -> anyhow::Result<Config> {
    let Some(path) = crate::paths::resolve_config_path(project_root) else {
        return Ok(Config::default());
    };
    let raw_text = std::fs::read_to_string(&path)?;
    let overlay: serde_yaml::Value = serde_yaml::from_str(&raw_text)?;
    let profile = overlay_profile(&overlay);
    let base = serde_yaml::to_value(Config::default_for_profile(profile))?;
    let merged = merge_yaml_values(base, overlay);
    let config: Config = serde_yaml::from_value(merged)?;
    Ok(config)
}
