//! Core types for podcast-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Idempotency unit recorded in the archive once a transfer commits
///
/// Built from an optional prefix and a derived name (see
/// [`naming::archive_key`](crate::naming::archive_key)). Distinct items must
/// derive distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveKey(pub String);

impl ArchiveKey {
    /// Create a new ArchiveKey
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ArchiveKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ArchiveKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl std::fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media enclosure attached to a feed item
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    /// Enclosure URL
    pub url: String,
    /// MIME type as declared by the feed
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Declared length in bytes
    #[serde(default)]
    pub length: Option<u64>,
}

/// Auxiliary asset tied to a work item (cover image, transcript, ...)
///
/// Secondary downloads never run the post-processing pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryDownload {
    /// Source URL
    pub url: String,
    /// Absolute destination path
    pub output_path: PathBuf,
    /// Archive key, if this asset participates in the archive
    #[serde(default)]
    pub key: Option<ArchiveKey>,
}

/// One enumerated feed entry, immutable once the batch starts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Item title
    pub title: String,
    /// Publish timestamp
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
    /// Unique identifier (feed guid)
    pub guid: String,
    /// Position within the source collection (0 = newest)
    pub original_index: usize,
    /// Enclosure element, when present
    #[serde(default)]
    pub enclosure: Option<Enclosure>,
    /// Link element, when present
    #[serde(default)]
    pub link: Option<String>,
    /// Item duration as declared by the feed
    #[serde(default)]
    pub duration: Option<String>,
    /// Author or creator
    #[serde(default)]
    pub author: Option<String>,
    /// Subtitle (itunes:subtitle)
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Full description (may contain markup)
    #[serde(default)]
    pub description: Option<String>,
    /// Plain-text description snippet
    #[serde(default)]
    pub description_text: Option<String>,
    /// Season number
    #[serde(default)]
    pub season: Option<String>,
    /// Episode number as declared by the feed
    #[serde(default)]
    pub episode: Option<String>,
    /// Episode type (full, trailer, bonus)
    #[serde(default)]
    pub episode_type: Option<String>,
    /// Auxiliary downloads for this item
    #[serde(default)]
    pub secondary_downloads: Vec<SecondaryDownload>,
}

/// Feed-level metadata used by templating and tagging
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInfo {
    /// Podcast title
    pub title: String,
    /// Podcast website link
    #[serde(default)]
    pub link: Option<String>,
    /// Total number of items in the feed (used for episode numbering)
    pub item_count: usize,
}

/// Description of one logical transfer
///
/// A fresh spec is built per top-level call; retries derive a copy with an
/// incremented `attempt`, never exceeding `max_attempts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSpec {
    /// Label used in log lines (item title or URL)
    pub marker: String,
    /// Source URL
    pub url: String,
    /// Final destination path
    pub output_path: PathBuf,
    /// Archive key, if this transfer participates in the archive
    pub key: Option<ArchiveKey>,
    /// Re-download even if the destination exists
    pub override_existing: bool,
    /// Run the commit hook even when skipping an existing file
    pub always_postprocess: bool,
    /// Current 1-based attempt number
    pub attempt: u32,
    /// Maximum number of attempts, first attempt included
    pub max_attempts: u32,
    /// Log progress lines while streaming
    pub show_progress: bool,
}

impl TransferSpec {
    /// Create a spec for the first attempt with default flags
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>, max_attempts: u32) -> Self {
        let url = url.into();
        Self {
            marker: url.clone(),
            url,
            output_path: output_path.into(),
            key: None,
            override_existing: false,
            always_postprocess: false,
            attempt: 1,
            max_attempts: max_attempts.max(1),
            show_progress: false,
        }
    }

    /// Set the log marker
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Set the archive key
    pub fn with_key(mut self, key: Option<ArchiveKey>) -> Self {
        self.key = key;
        self
    }

    /// Set the override flag
    pub fn with_override(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    /// Set the always-postprocess flag
    pub fn with_always_postprocess(mut self, always_postprocess: bool) -> Self {
        self.always_postprocess = always_postprocess;
        self
    }

    /// Enable or disable progress logging
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The spec for the next attempt, or None once the budget is spent
    pub fn next_attempt(&self) -> Option<Self> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        Some(Self {
            attempt: self.attempt + 1,
            ..self.clone()
        })
    }

    /// Temporary path the body is streamed into before commit
    pub fn temp_path(&self) -> PathBuf {
        temp_path_for(&self.output_path)
    }
}

/// `<path>.tmp`, the staging location for a destination path
pub fn temp_path_for(path: &std::path::Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// How a transfer ended without error
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Payload streamed, committed, hook run and archive updated
    Committed,
    /// Destination already existed and override was not requested
    SkippedExisting,
    /// Archive already contained the key
    SkippedArchived,
    /// The server returned an empty body; nothing was committed
    EmptyResult,
}

/// Aggregate result of a batch run
///
/// Per-item failures are only observable through logs and events.
#[must_use]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of primary transfers whose post-processing completed
    pub completed_count: usize,
    /// Whether any item-level failure occurred
    pub had_errors: bool,
}

/// Why a transfer was skipped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Destination exists locally
    ExistsLocally,
    /// Key present in the archive
    InArchive,
}

/// Event emitted by the downloader
///
/// Events are broadcast to all subscribers; sending never affects a transfer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A transfer started streaming
    TransferStarted {
        /// Log marker of the transfer
        marker: String,
        /// Source URL
        url: String,
        /// Expected size from the size probe
        #[serde(skip_serializing_if = "Option::is_none")]
        expected_bytes: Option<u64>,
        /// 1-based attempt number
        attempt: u32,
    },

    /// Throttled progress update for an in-flight transfer
    Progress {
        /// Log marker of the transfer
        marker: String,
        /// Bytes written so far
        transferred_bytes: u64,
        /// Expected total, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
    },

    /// A transfer committed to its destination
    TransferComplete {
        /// Log marker of the transfer
        marker: String,
        /// Destination path
        path: PathBuf,
    },

    /// A transfer was skipped
    TransferSkipped {
        /// Log marker of the transfer
        marker: String,
        /// Why it was skipped
        reason: SkipReason,
    },

    /// A transfer produced an empty file and was discarded
    EmptyResult {
        /// Log marker of the transfer
        marker: String,
        /// Source URL
        url: String,
    },

    /// An item-level failure was recorded
    ItemFailed {
        /// Log marker of the item
        marker: String,
        /// Error message
        error: String,
    },

    /// The batch finished
    BatchComplete {
        /// Aggregate result
        result: BatchResult,
    },
}
