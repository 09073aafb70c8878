//! Domain layer for roundtable
//!
//! This crate contains the discussion aggregate, the persona catalog and the
//! structured findings model. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! A [`Session`] is the aggregate root of one deliberation. It owns the ordered
//! list of [`Round`]s, one [`SufficiencyJudgment`] per judged round, and the
//! final [`IdentifiedIssue`] / [`ProposedSolution`] sets.
//!
//! ## Round protocol
//!
//! Every round walks the five [`RoundPhase`]s in order. The three fan-out
//! phases collect one [`Statement`] per participant; consensus and summary are
//! single [`Synthesis`] records written by the round's moderator.
//!
//! ## Two layers of findings
//!
//! Statements carry raw, unstructured issue and solution fragments. Structured
//! entities only appear after extraction merges them across rounds
//! (see [`findings::FindingsMerger`]).

pub mod core;
pub mod discussion;
pub mod findings;
pub mod parsing;
pub mod persona;
pub mod prompt;
pub mod providers;
pub mod validation;

// Re-export commonly used types
pub use core::error::DomainError;
pub use discussion::{
    judgment::{ConvergencePolicy, SufficiencyJudgment},
    org_context::OrgContext,
    phase::RoundPhase,
    round::Round,
    session::{Session, SessionId},
    statement::{Statement, Synthesis},
    status::{SessionStatus, TransitionError},
};
pub use findings::{
    category::{IssueCategory, Priority},
    entities::{IdentifiedIssue, ProposedSolution},
    merge::{ExtractionBatch, FindingsMerger, IssueCandidate, SolutionCandidate, drop_orphans},
};
pub use parsing::{
    JudgeAssessment, ParseError, RawFragments, parse_extraction_response, parse_fragments,
    parse_judge_response,
};
pub use persona::{
    catalog::{COORDINATOR_ID, PersonaCatalog},
    profile::{LlmSettings, PersonaKind, PersonaProfile},
};
pub use prompt::PromptTemplate;
pub use providers::{AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ProviderKind};
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
