//! Sidecar metadata for episodes
//!
//! Writes a `.meta.json` document next to an episode, following the same
//! idempotency rules as a transfer: archived keys and existing files are
//! skipped, writes are atomic, and the key is recorded only after the file
//! is in place.

use crate::archive::ArchiveStore;
use crate::error::{PostProcessError, Result};
use crate::types::{ArchiveKey, TransferOutcome, WorkItem, temp_path_for};
use crate::utils::{path_exists, remove_if_present};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Document written to the sidecar file
#[derive(Debug, Serialize)]
pub struct ItemMeta<'a> {
    /// Item title
    pub title: &'a str,
    /// Full description
    pub description: Option<&'a str>,
    /// Plain-text description
    pub description_text: Option<&'a str>,
    /// Publish timestamp
    pub pub_date: Option<DateTime<Utc>>,
    /// Author or creator
    pub creator: Option<&'a str>,
    /// Unique identifier
    pub guid: &'a str,
    /// Declared duration
    pub duration: Option<&'a str>,
}

impl<'a> From<&'a WorkItem> for ItemMeta<'a> {
    fn from(item: &'a WorkItem) -> Self {
        Self {
            title: &item.title,
            description: item.description.as_deref(),
            description_text: item.description_text.as_deref(),
            pub_date: item.pub_date,
            creator: item.author.as_deref(),
            guid: &item.guid,
            duration: item.duration.as_deref(),
        }
    }
}

/// Write the sidecar metadata for `item` to `output_path`
///
/// Returns how the write ended: `SkippedArchived` when `key` is already in
/// `archive`, `SkippedExisting` when the file exists and `override_existing`
/// is false, `Committed` otherwise.
pub async fn write_item_meta(
    item: &WorkItem,
    output_path: &Path,
    key: Option<&ArchiveKey>,
    archive: Option<&dyn ArchiveStore>,
    override_existing: bool,
) -> Result<TransferOutcome> {
    if let (Some(key), Some(archive)) = (key, archive)
        && archive.contains(key).await?
    {
        info!(path = %output_path.display(), "Episode metadata exists in archive. Skipping...");
        return Ok(TransferOutcome::SkippedArchived);
    }

    if !override_existing && path_exists(output_path).await {
        info!(path = %output_path.display(), "Episode metadata exists locally. Skipping...");
        return Ok(TransferOutcome::SkippedExisting);
    }

    let write_failed = |reason: String| PostProcessError::MetadataWriteFailed {
        path: output_path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_vec_pretty(&ItemMeta::from(item))?;
    let tmp = temp_path_for(output_path);

    if let Err(e) = tokio::fs::write(&tmp, &json).await {
        remove_if_present(&tmp).await;
        return Err(write_failed(e.to_string()).into());
    }

    if let Err(e) = tokio::fs::rename(&tmp, output_path).await {
        remove_if_present(&tmp).await;
        return Err(write_failed(e.to_string()).into());
    }

    if let (Some(key), Some(archive)) = (key, archive) {
        archive.append(key).await?;
    }

    Ok(TransferOutcome::Committed)
}
