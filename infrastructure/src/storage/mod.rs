//! Session persistence adapters

mod json_store;

pub use json_store::{JsonFileSessionStore, StorageHealth};
