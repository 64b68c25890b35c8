//! Batch orchestration: runs work items through a bounded pool.

use super::Downloader;
use crate::error::{Error, Result};
use crate::metadata::write_item_meta;
use crate::naming::{archive_filename, archive_key, item_filename};
use crate::post_processing::{BatchCounters, PostProcessContext, PostProcessPipeline};
use crate::resolver::resolve_source;
use crate::types::{ArchiveKey, BatchResult, Event, FeedInfo, TransferSpec, WorkItem};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span};

/// Extension of sidecar metadata files
const EPISODE_META_EXT: &str = ".meta.json";

/// Log marker for an item: `[slot] title` when more than one slot exists
pub(crate) fn item_marker(title: &str, index: usize, threads: usize) -> String {
    if threads > 1 {
        format!("[{}] {}", index % threads, title)
    } else {
        title.to_string()
    }
}

impl Downloader {
    /// Download every item, at most `threads` at a time
    ///
    /// Items are admitted in order. Item-level failures are logged, broadcast
    /// as [`Event::ItemFailed`] and folded into `had_errors`; they never stop
    /// other items. Returns once every item has settled.
    pub async fn run_batch(&self, feed: &FeedInfo, items: Vec<WorkItem>) -> BatchResult {
        let threads = self.config.download.threads.max(1);
        let concurrent_limit = Arc::new(Semaphore::new(threads));
        let counters = Arc::new(BatchCounters::default());
        let feed = Arc::new(feed.clone());

        info!(items = items.len(), threads, "Starting batch");

        let mut handles = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            // Acquiring here, in submission order, keeps admission FIFO
            let permit = match concurrent_limit.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    error!("concurrency limiter closed, abandoning remaining items");
                    counters.record_error();
                    break;
                }
            };

            let marker = item_marker(&item.title, index, threads);
            let span = info_span!("item", marker = %marker);
            let downloader = self.clone();
            let feed = Arc::clone(&feed);
            let counters = Arc::clone(&counters);

            handles.push(tokio::spawn(
                async move {
                    let _permit = permit;
                    downloader
                        .process_item(&feed, &item, &marker, &counters)
                        .await;
                }
                .instrument(span),
            ));
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "item task panicked");
                counters.record_error();
            }
        }

        let result = counters.snapshot();
        info!(
            completed = result.completed_count,
            had_errors = result.had_errors,
            "Batch complete"
        );
        self.emit(Event::BatchComplete { result });
        result
    }

    /// Per-item procedure: primary transfer, secondary downloads, sidecar metadata
    async fn process_item(
        &self,
        feed: &FeedInfo,
        item: &WorkItem,
        marker: &str,
        counters: &Arc<BatchCounters>,
    ) {
        let config = &self.config;

        let Some(source) = resolve_source(item, &config.naming.source_order) else {
            let err = Error::UnresolvableSource {
                title: item.title.clone(),
            };
            self.record_failure(marker, "Unable to find episode download URL", &err, counters);
            return;
        };

        let relative_path = item_filename(item, feed, &source.url, &source.ext, &config.naming);
        let output_path = config.download.base_path.join(&relative_path);

        if let Err(e) = prepare_output_path(&output_path).await {
            self.record_failure(marker, "Unable to prepare output directory", &e, counters);
            return;
        }

        let spec = TransferSpec::new(&source.url, &output_path, config.retry.max_attempts)
            .with_marker(marker)
            .with_key(Some(self.item_key(item, &source.ext)))
            .with_override(config.download.override_existing)
            .with_always_postprocess(config.download.always_postprocess)
            .with_progress(config.download.show_progress);

        let pipeline = PostProcessPipeline::for_config(
            &config.post_process,
            Arc::clone(&self.transcoder),
            Arc::clone(counters),
        );
        let hook = pipeline.bind(PostProcessContext {
            item,
            feed,
            output_path: &output_path,
            relative_path: &relative_path,
            url: &source.url,
            ext: &source.ext,
        });

        if let Err(e) = self.transfer(&spec, Some(&hook)).await {
            self.record_failure(marker, "Error downloading episode", &e, counters);
        }

        for extra in &item.secondary_downloads {
            let spec = TransferSpec::new(&extra.url, &extra.output_path, config.retry.max_attempts)
                .with_key(extra.key.clone())
                .with_override(config.download.override_existing);

            let result = match prepare_output_path(&extra.output_path).await {
                Ok(()) => self.transfer(&spec, None).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                let context = format!("Error downloading {}", extra.url);
                self.record_failure(marker, &context, &e, counters);
            }
        }

        if config.post_process.include_episode_meta {
            let meta_relative =
                item_filename(item, feed, &source.url, EPISODE_META_EXT, &config.naming);
            let meta_path = config.download.base_path.join(meta_relative);
            let key = self.item_key(item, EPISODE_META_EXT);

            info!(marker, "Saving episode metadata...");
            let result = match prepare_output_path(&meta_path).await {
                Ok(()) => write_item_meta(
                    item,
                    &meta_path,
                    Some(&key),
                    self.archive.as_deref(),
                    config.download.override_existing,
                )
                .await
                .map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                self.record_failure(marker, "Error saving episode metadata", &e, counters);
            }
        }
    }

    fn item_key(&self, item: &WorkItem, ext: &str) -> ArchiveKey {
        let name = archive_filename(item.pub_date.as_ref(), &item.title, ext);
        archive_key(self.config.archive.prefix.as_deref(), &name)
    }

    fn record_failure(&self, marker: &str, context: &str, err: &Error, counters: &BatchCounters) {
        counters.record_error();
        error!(marker, error = %err, code = err.error_code(), "{}", context);
        self.emit(Event::ItemFailed {
            marker: marker.to_string(),
            error: format!("{}: {}", context, err),
        });
    }
}

/// Ensure the parent directory of `path` exists
async fn prepare_output_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory '{}': {}", parent.display(), e),
            ))
        })?;
    }
    Ok(())
}
