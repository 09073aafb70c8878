//! Storage and logging configuration (`[storage]` and `[logging]` sections)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding one JSON file per session
    pub path: PathBuf,
    /// Directory the CLI writes Markdown reports to
    pub reports_dir: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/discussions"),
            reports_dir: PathBuf::from("./reports"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving provider call telemetry; disabled when unset
    pub telemetry_file: Option<PathBuf>,
}
