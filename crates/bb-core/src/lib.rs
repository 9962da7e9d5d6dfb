pub mod error;
pub mod types;

pub use error::BbError;
pub use types::{Decision, RiskLevel, RiskScore, Severity, ToolInput, Violation, ViolationType};
