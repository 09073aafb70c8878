//! Use cases
//!
//! Application-level operations that orchestrate domain logic.
//!
//! | Use case | Role |
//! |----------|------|
//! | [`invocation`] | retrying, rate-limited persona calls |
//! | [`run_round`] | five-phase protocol of one round |
//! | [`judge_sufficiency`] | scores evidence after a round |
//! | [`extract_findings`] | structured issues and solutions |
//! | [`run_discussion`] | session lifecycle and persistence |

pub mod extract_findings;
pub mod invocation;
pub mod judge_sufficiency;
pub mod run_discussion;
pub mod run_round;

#[cfg(test)]
pub(crate) mod testing;
