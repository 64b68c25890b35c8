//! Shared test helpers for creating Downloader instances in tests.

use super::{CommitHook, Downloader};
use crate::archive::ArchiveStore;
use crate::config::Config;
use crate::error::{ArchiveError, Error, Result};
use crate::transcode::{NoOpTranscoder, TranscodeJob, Transcoder};
use crate::types::{ArchiveKey, Enclosure, FeedInfo, WorkItem};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Config rooted at `base` with progress logging off and immediate retries
pub(crate) fn test_config(base: &Path) -> Config {
    let mut config = Config::default();
    config.download.base_path = base.to_path_buf();
    config.download.show_progress = false;
    config.naming.episode_template = "{{title}}".to_string();
    config
}

/// Downloader with the given archive and no transcoder
pub(crate) fn create_test_downloader(
    config: Config,
    archive: Option<Arc<dyn ArchiveStore>>,
) -> Downloader {
    Downloader::with_parts(config, archive, Arc::new(NoOpTranscoder)).unwrap()
}

/// Feed with `item_count` items
pub(crate) fn test_feed(item_count: usize) -> FeedInfo {
    FeedInfo {
        title: "Test Show".to_string(),
        link: Some("https://example.com".to_string()),
        item_count,
    }
}

/// Item whose enclosure points at `url`
pub(crate) fn episode(title: &str, url: &str, index: usize) -> WorkItem {
    WorkItem {
        title: title.to_string(),
        guid: format!("guid-{index}"),
        original_index: index,
        enclosure: Some(Enclosure {
            url: url.to_string(),
            mime_type: Some("audio/mpeg".to_string()),
            length: None,
        }),
        ..Default::default()
    }
}

/// Commit hook counting its invocations
#[derive(Default)]
pub(crate) struct CountingHook {
    pub(crate) calls: AtomicUsize,
}

impl CountingHook {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitHook for CountingHook {
    async fn after_commit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Commit hook that always fails
pub(crate) struct FailingHook;

#[async_trait]
impl CommitHook for FailingHook {
    async fn after_commit(&self) -> Result<()> {
        Err(Error::ExternalTool("hook failed".to_string()))
    }
}

/// Archive whose appends always fail
pub(crate) struct ReadOnlyArchive;

#[async_trait]
impl ArchiveStore for ReadOnlyArchive {
    async fn contains(&self, _key: &ArchiveKey) -> Result<bool> {
        Ok(false)
    }

    async fn append(&self, _key: &ArchiveKey) -> Result<()> {
        Err(ArchiveError::WriteFailed {
            path: "archive.json".into(),
            reason: "read-only file system".to_string(),
        }
        .into())
    }

    fn name(&self) -> &'static str {
        "read-only"
    }
}

/// Transcoder that sleeps, copies its input and tracks concurrency
#[derive(Default)]
pub(crate) struct SlowTranscoder {
    active: AtomicUsize,
    pub(crate) max_active: AtomicUsize,
    pub(crate) started: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Transcoder for SlowTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let name = job
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.started.lock().unwrap().push(name);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let copied = tokio::fs::copy(&job.input, &job.output).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        copied?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}
