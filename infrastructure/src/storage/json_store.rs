//! One JSON document per session on the local filesystem.
//!
//! Layout: `<dir>/<session_id>.json`. Writes go to a sibling temp file that
//! is then renamed over the target, so a reader never sees a half-written
//! snapshot.

use async_trait::async_trait;
use roundtable_application::ports::session_repository::{SessionRepository, StoreError};
use roundtable_domain::{Session, SessionId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HEALTH_MARKER: &str = ".health_check";

pub struct JsonFileSessionStore {
    dir: PathBuf,
}

/// Outcome of [`JsonFileSessionStore::health_check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHealth {
    pub exists: bool,
    pub writable: bool,
    pub session_files: usize,
    pub error: Option<String>,
}

impl StorageHealth {
    pub fn is_healthy(&self) -> bool {
        self.exists && self.writable && self.error.is_none()
    }
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Check that the directory exists and accepts writes, and count the
    /// stored sessions. Never creates the directory.
    pub async fn health_check(&self) -> StorageHealth {
        let mut health = StorageHealth {
            exists: false,
            writable: false,
            session_files: 0,
            error: None,
        };

        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => health.exists = true,
            Ok(_) => {
                health.error = Some("path is not a directory".to_string());
                return health;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                health.error = Some("directory does not exist".to_string());
                return health;
            }
            Err(e) => {
                health.error = Some(e.to_string());
                return health;
            }
        }

        if let Err(e) = self.write_marker().await {
            health.error = Some(format!("directory is not writable: {}", e));
            return health;
        }
        health.writable = true;

        match self.count_session_files().await {
            Ok(count) => health.session_files = count,
            Err(e) => health.error = Some(e.to_string()),
        }
        health
    }

    async fn write_marker(&self) -> std::io::Result<()> {
        let marker = self.dir.join(HEALTH_MARKER);
        tokio::fs::write(&marker, b"ok").await?;
        tokio::fs::remove_file(&marker).await
    }

    async fn count_session_files(&self) -> std::io::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if is_session_file(&entry.path()) {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// `<id>.json`, excluding hidden temp files
fn is_session_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
}

#[async_trait]
impl SessionRepository for JsonFileSessionStore {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_vec_pretty(session)?;
        let target = self.path_for(session.id());
        let tmp = self.dir.join(format!(".{}.json.tmp", session.id()));

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &target).await?;

        debug!(session = %session.id(), status = %session.status(), "Session saved");
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<Session, StoreError> {
        let bytes = match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_session_file(&path) {
                continue;
            }

            let parsed = tokio::fs::read(&path)
                .await
                .map_err(StoreError::from)
                .and_then(|bytes| serde_json::from_slice::<Session>(&bytes).map_err(StoreError::from));
            match parsed {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping unreadable session file {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(sessions)
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
