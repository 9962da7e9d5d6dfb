#[derive(thiserror::Error, Debug)]
pub enum BbError {
    #[error("policy violation: {0}")]
    Policy(String),

    #[error("shared store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("audit log unavailable: {0}")]
    AuditUnavailable(String),
}
