pub mod anomaly_detector;
pub mod loop_detector;
pub mod rate_limiter;

pub use anomaly_detector::{AnomalyDetector, LocalAnomalyDetector};
pub use loop_detector::{normalize, LocalLoopDetector, LoopDetector};
pub use rate_limiter::{LocalRateLimiter, RateLimiter};
