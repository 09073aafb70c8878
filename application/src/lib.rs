//! Application layer for roundtable
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::DiscussionParams;
pub use ports::{
    llm_gateway::{CallPurpose, LlmGateway, LlmRequest, LlmResponse, ProviderError, TokenUsage},
    progress::{NoProgress, ProgressNotifier},
    session_repository::{SessionRepository, StoreError},
    telemetry::{NoTelemetry, TelemetryEvent, TelemetrySink},
};
pub use use_cases::extract_findings::{ExtractionError, Findings, FindingsExtractor};
pub use use_cases::invocation::{BackoffPolicy, InvocationGateway, PromptContext};
pub use use_cases::judge_sufficiency::{JudgmentError, SufficiencyJudge};
pub use use_cases::run_discussion::{CANCELLED_REASON, CoordinatorError, DiscussionCoordinator};
pub use use_cases::run_round::{RoundBrief, RoundController, RoundError};
