//! BoardAudit library
//!
//! Exposes modules for integration testing

pub mod analyzer;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod session;

// Re-export commonly used types for external use
pub use analyzer::remote::{GenerationParams, RemoteOutcome, TextGenerator};
pub use analyzer::MemberAnalyzer;
pub use config::{AppConfig, Credentials, InferenceBackend};
pub use records::MemberRecord;
pub use report::{ProvisioningEntry, ProvisioningRecommendations};
pub use session::{SessionDriver, SessionState};
