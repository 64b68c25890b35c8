//! Transfer task: materializes one URL to one local path.
//!
//! Order of operations for one logical transfer:
//! 1. Skip if the destination exists (running the hook when asked to)
//! 2. Skip if the archive already holds the key
//! 3. Best-effort size probe
//! 4. Stream to `<dest>.tmp`, retrying stream failures up to the attempt budget
//! 5. Discard empty results
//! 6. Rename into place, run the commit hook, record the archive key

use super::Downloader;
use super::progress::{ProgressThrottle, as_mb};
use crate::error::{ArchiveError, Error, Result, TransferError};
use crate::retry::download_with_retry;
use crate::types::{Event, SkipReason, TransferOutcome, TransferSpec};
use crate::utils::{path_exists, remove_if_present};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Side effect run once a transfer has committed its file
///
/// The transfer awaits the hook before recording the archive key, so a hook
/// failure leaves the key unrecorded.
#[async_trait]
pub trait CommitHook: Send + Sync {
    /// Run after the destination file is in place
    async fn after_commit(&self) -> Result<()>;
}

impl Downloader {
    /// Perform one idempotent, retrying, atomically-committing download
    ///
    /// # Errors
    ///
    /// - [`TransferError::AttemptsExhausted`] when every attempt failed
    /// - [`TransferError::CommitFailed`] when the temp file cannot be renamed
    /// - any error returned by `hook`
    /// - [`TransferError::ArchiveWrite`] when the key cannot be recorded
    ///
    /// A zero-byte body is not an error: it yields
    /// [`TransferOutcome::EmptyResult`] and is not retried.
    pub async fn transfer(
        &self,
        spec: &TransferSpec,
        hook: Option<&dyn CommitHook>,
    ) -> Result<TransferOutcome> {
        let marker = spec.marker.as_str();

        if !spec.override_existing && path_exists(&spec.output_path).await {
            info!(marker, path = %spec.output_path.display(), "Download exists locally. Skipping...");
            self.emit(Event::TransferSkipped {
                marker: marker.to_string(),
                reason: SkipReason::ExistsLocally,
            });

            if spec.always_postprocess
                && let Some(hook) = hook
            {
                hook.after_commit().await?;
            }
            return Ok(TransferOutcome::SkippedExisting);
        }

        if let (Some(key), Some(archive)) = (&spec.key, &self.archive)
            && archive.contains(key).await?
        {
            info!(marker, key = %key, "Download exists in archive. Skipping...");
            self.emit(Event::TransferSkipped {
                marker: marker.to_string(),
                reason: SkipReason::InArchive,
            });
            return Ok(TransferOutcome::SkippedArchived);
        }

        let expected_bytes = self.probe_size(&spec.url).await;
        match expected_bytes {
            Some(bytes) => info!(marker, "Starting download of {:.2} MB...", as_mb(bytes)),
            None => info!(marker, "Starting download..."),
        }

        let temp_path = spec.temp_path();
        let written = download_with_retry(
            &self.config.retry,
            spec.attempt,
            spec.max_attempts,
            |attempt| {
                let temp_path = temp_path.clone();
                async move {
                    let result = self
                        .stream_to_temp(spec, attempt, &temp_path, expected_bytes)
                        .await;
                    if result.is_err() {
                        remove_if_present(&temp_path).await;
                    }
                    result
                }
            },
        )
        .await
        .map_err(|e| match e {
            Error::Transfer(TransferError::Stream {
                url,
                attempt,
                reason,
            }) => Error::Transfer(TransferError::AttemptsExhausted {
                url,
                attempts: attempt,
                last_error: reason,
            }),
            other => other,
        })?;

        if written == 0 {
            remove_if_present(&temp_path).await;
            warn!(
                marker,
                url = %spec.url,
                "Unable to write to file. Suggestion: verify permissions"
            );
            self.emit(Event::EmptyResult {
                marker: marker.to_string(),
                url: spec.url.clone(),
            });
            return Ok(TransferOutcome::EmptyResult);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &spec.output_path).await {
            remove_if_present(&temp_path).await;
            return Err(TransferError::CommitFailed {
                temp_path,
                dest_path: spec.output_path.clone(),
                reason: e.to_string(),
            }
            .into());
        }

        info!(marker, path = %spec.output_path.display(), bytes = written, "Download complete!");
        self.emit(Event::TransferComplete {
            marker: marker.to_string(),
            path: spec.output_path.clone(),
        });

        if let Some(hook) = hook {
            hook.after_commit().await?;
        }

        if let (Some(key), Some(archive)) = (&spec.key, &self.archive) {
            archive.append(key).await.map_err(|e| {
                let source = match e {
                    Error::Archive(inner) => inner,
                    other => ArchiveError::WriteFailed {
                        path: PathBuf::from(archive.name()),
                        reason: other.to_string(),
                    },
                };
                Error::Transfer(TransferError::ArchiveWrite(source))
            })?;
            debug!(marker, key = %key, "archive entry recorded");
        }

        Ok(TransferOutcome::Committed)
    }

    /// Expected payload size from a metadata-only request; any failure yields None
    async fn probe_size(&self, url: &str) -> Option<u64> {
        let response = self
            .client
            .head(url)
            .header(ACCEPT, "*/*")
            .timeout(self.config.download.probe_timeout)
            .send()
            .await
            .map_err(|e| debug!(url, error = %e, "size probe failed"))
            .ok()?;

        if !response.status().is_success() {
            debug!(url, status = %response.status(), "size probe rejected");
            return None;
        }

        response
            .headers()
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse::<u64>()
            .ok()
            .filter(|&bytes| bytes > 0)
    }

    /// Stream one attempt's body into `temp_path`, returning the bytes written
    async fn stream_to_temp(
        &self,
        spec: &TransferSpec,
        attempt: u32,
        temp_path: &Path,
        expected_bytes: Option<u64>,
    ) -> Result<u64> {
        let stream_failed = |reason: String| -> Error {
            TransferError::Stream {
                url: spec.url.clone(),
                attempt,
                reason,
            }
            .into()
        };

        self.emit(Event::TransferStarted {
            marker: spec.marker.clone(),
            url: spec.url.clone(),
            expected_bytes,
            attempt,
        });

        let request = self.client.get(&spec.url).send();
        let sent = match self.config.download.read_timeout {
            Some(idle) => tokio::time::timeout(idle, request)
                .await
                .map_err(|_| stream_failed(format!("no response received for {:?}", idle)))?,
            None => request.await,
        };
        let mut response = sent
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| stream_failed(e.to_string()))?;

        let total = expected_bytes.or_else(|| response.content_length());

        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| stream_failed(format!("failed to create {}: {}", temp_path.display(), e)))?;

        let mut throttle = ProgressThrottle::new(self.config.download.progress_interval);
        let mut written: u64 = 0;

        loop {
            let next = match self.config.download.read_timeout {
                Some(idle) => tokio::time::timeout(idle, response.chunk())
                    .await
                    .map_err(|_| stream_failed(format!("no data received for {:?}", idle)))?,
                None => response.chunk().await,
            };

            let Some(chunk) = next.map_err(|e| stream_failed(e.to_string()))? else {
                break;
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| stream_failed(format!("write failed: {}", e)))?;
            written += chunk.len() as u64;

            if throttle.should_emit(written, total) {
                if spec.show_progress {
                    match total {
                        Some(total) => info!(
                            marker = %spec.marker,
                            "{:.0}% of {:.2} MB...",
                            written as f64 / total as f64 * 100.0,
                            as_mb(total)
                        ),
                        None => info!(marker = %spec.marker, "{:.2} MB...", as_mb(written)),
                    }
                }
                self.emit(Event::Progress {
                    marker: spec.marker.clone(),
                    transferred_bytes: written,
                    total_bytes: total,
                });
            }
        }

        file.flush()
            .await
            .map_err(|e| stream_failed(format!("flush failed: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| stream_failed(format!("sync failed: {}", e)))?;

        if attempt > 1 {
            debug!(marker = %spec.marker, attempt, "stream succeeded on retry");
        }
        Ok(written)
    }
}
