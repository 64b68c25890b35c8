//! In-memory archive

use super::traits::ArchiveStore;
use crate::types::ArchiveKey;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Archive held in process memory
///
/// Nothing survives the process; useful for tests and single runs that still
/// want duplicate keys within a batch to be skipped.
#[derive(Default)]
pub struct MemoryArchive {
    keys: RwLock<HashSet<ArchiveKey>>,
}

impl MemoryArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an archive pre-populated with keys
    pub fn with_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ArchiveKey>,
    {
        Self {
            keys: RwLock::new(keys.into_iter().map(Into::into).collect()),
        }
    }

    /// Number of recorded keys
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether no keys are recorded
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn contains(&self, key: &ArchiveKey) -> crate::Result<bool> {
        Ok(self.keys.read().await.contains(key))
    }

    async fn append(&self, key: &ArchiveKey) -> crate::Result<()> {
        self.keys.write().await.insert(key.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
