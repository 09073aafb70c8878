//! Structured findings extracted from raw statements

pub mod category;
pub mod entities;
pub mod merge;
