//! Trait for archive stores

use crate::types::ArchiveKey;
use async_trait::async_trait;

/// Key-based idempotency ledger
///
/// Implementations must make `append` durable before returning `Ok`, and must
/// treat appending an existing key as a successful no-op.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Whether the key has already been recorded
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn contains(&self, key: &ArchiveKey) -> crate::Result<bool>;

    /// Record the key
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written. Callers treat
    /// this as fatal for the transfer that produced the key.
    async fn append(&self, key: &ArchiveKey) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
