//! Personas: configured reasoning identities taking part in a discussion

pub mod catalog;
pub mod profile;
