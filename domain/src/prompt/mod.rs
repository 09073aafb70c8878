//! Prompt domain
//!
//! Templates for every call the discussion makes: persona statements per
//! phase, moderator syntheses, the sufficiency judge and the extractor.

mod template;

pub use template::PromptTemplate;
