//! JSON file archive

use super::traits::ArchiveStore;
use crate::error::{ArchiveError, Result};
use crate::types::{ArchiveKey, temp_path_for};
use crate::utils::remove_if_present;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Archive persisted as a JSON array of keys
///
/// The whole file is loaded on open and rewritten on every append. Rewrites
/// go through a temp file and a rename, so a crash never leaves a truncated
/// archive behind.
///
/// # Examples
///
/// ```no_run
/// use podcast_dl::archive::{ArchiveStore, JsonArchive};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = JsonArchive::open("/podcasts/archive.json").await?;
/// println!("{} keys recorded", archive.len().await);
/// # Ok(())
/// # }
/// ```
pub struct JsonArchive {
    path: PathBuf,
    state: Mutex<ArchiveState>,
}

#[derive(Default)]
struct ArchiveState {
    /// Keys in insertion order, as written to disk
    keys: Vec<ArchiveKey>,
    index: HashSet<ArchiveKey>,
}

impl JsonArchive {
    /// Open an archive file, treating a missing file as an empty archive
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let keys: Vec<ArchiveKey> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| ArchiveError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ArchiveError::ReadFailed {
                    path,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let index = keys.iter().cloned().collect();
        tracing::debug!(path = %path.display(), keys = keys.len(), "archive loaded");

        Ok(Self {
            path,
            state: Mutex::new(ArchiveState { keys, index }),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded keys
    pub async fn len(&self) -> usize {
        self.state.lock().await.keys.len()
    }

    /// Whether no keys are recorded
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.keys.is_empty()
    }

    async fn persist(&self, keys: &[ArchiveKey]) -> std::result::Result<(), ArchiveError> {
        let write_failed = |reason: String| ArchiveError::WriteFailed {
            path: self.path.clone(),
            reason,
        };

        let json = serde_json::to_vec_pretty(keys).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let tmp = temp_path_for(&self.path);
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            remove_if_present(&tmp).await;
            return Err(write_failed(e.to_string()));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            remove_if_present(&tmp).await;
            return Err(write_failed(e.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for JsonArchive {
    async fn contains(&self, key: &ArchiveKey) -> Result<bool> {
        Ok(self.state.lock().await.index.contains(key))
    }

    async fn append(&self, key: &ArchiveKey) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.index.contains(key) {
            return Ok(());
        }

        state.keys.push(key.clone());
        if let Err(e) = self.persist(&state.keys).await {
            state.keys.pop();
            return Err(e.into());
        }
        state.index.insert(key.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
