//! Session persistence port

use async_trait::async_trait;
use roundtable_domain::{Session, SessionId};
use thiserror::Error;

/// Errors raised by a session store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session {0} not found")]
    NotFound(SessionId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Other(String),
}

/// Durable storage of session snapshots.
///
/// `save` replaces the whole snapshot; a session is only ever written by
/// one process at a time.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn load(&self, id: SessionId) -> Result<Session, StoreError>;

    /// All stored sessions, most recently created first
    async fn list(&self) -> Result<Vec<Session>, StoreError>;

    /// Returns whether a session was removed
    async fn delete(&self, id: SessionId) -> Result<bool, StoreError>;
}
