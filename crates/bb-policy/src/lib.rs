pub mod command_filter;
pub mod engine;
pub mod path_sandbox;
pub mod risk;
pub mod secrets;

pub use command_filter::CommandFilter;
pub use engine::{Evaluation, ExtraCheck, PolicyEngine};
pub use path_sandbox::PathSandbox;
pub use risk::RiskScorer;
pub use secrets::{scan_text, ScanFinding, ScanResult, SecretsGuard};
