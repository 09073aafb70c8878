//! Application-level configuration.
//!
//! - [`DiscussionParams`] controls the round loop (limits, roles, concurrency, backoff)

pub mod discussion_params;

pub use discussion_params::DiscussionParams;
