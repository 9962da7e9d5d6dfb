pub mod achievements;
pub mod command_store;
pub mod schema;
pub mod store;

pub use achievements::{compute_achievements, compute_xp, Achievement, AchievementStats, Tier};
pub use command_store::CommandStore;
pub use store::{
    CommandRow, NewCommand, NewToolUse, NewUserPrompt, SessionMetrics, SessionRow, SessionUpdate,
    Store, UserPromptRow, UserPromptStats, USER_PROMPT_MAX_CHARS,
};
