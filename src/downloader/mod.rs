//! Core downloader implementation split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by concern:
//! - [`transfer`] - One URL to one local path, with retry and atomic commit
//! - [`progress`] - Rate-gated progress notifications
//! - [`batch`] - Bounded-concurrency orchestration of work items

mod batch;
mod progress;
mod transfer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use progress::ProgressThrottle;
pub use transfer::CommitHook;

use crate::archive::{ArchiveStore, JsonArchive};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::transcode::{FfmpegTranscoder, NoOpTranscoder, Transcoder};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event channel; slower subscribers observe `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP client shared by every transfer
    pub(crate) client: reqwest::Client,
    /// Idempotency ledger; None disables archive checks
    pub(crate) archive: Option<Arc<dyn ArchiveStore>>,
    /// Transcoder used by the post-processing pipeline
    pub(crate) transcoder: Arc<dyn Transcoder>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl Downloader {
    /// Create a new Downloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens the JSON archive, if one is configured
    /// - Locates ffmpeg (explicit path first, then PATH)
    /// - Builds the HTTP client and the event channel
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let archive: Option<Arc<dyn ArchiveStore>> = match &config.archive.path {
            Some(path) => Some(Arc::new(JsonArchive::open(path).await?)),
            None => None,
        };

        let transcoder: Arc<dyn Transcoder> =
            if let Some(ref ffmpeg_path) = config.post_process.ffmpeg_path {
                Arc::new(FfmpegTranscoder::new(ffmpeg_path.clone()))
            } else {
                FfmpegTranscoder::from_path()
                    .map(|t| Arc::new(t) as Arc<dyn Transcoder>)
                    .unwrap_or_else(|| Arc::new(NoOpTranscoder))
            };

        if config.post_process.wants_transcode() && transcoder.name() == "noop" {
            tracing::warn!("transcoding requested but ffmpeg was not found; affected items will fail");
        }

        Self::with_parts(config, archive, transcoder)
    }

    /// Create a Downloader from explicit parts
    ///
    /// Used to inject an archive store or transcoder other than the ones
    /// [`Downloader::new`] would pick.
    pub fn with_parts(
        config: Config,
        archive: Option<Arc<dyn ArchiveStore>>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(config.download.user_agent.clone())
            .build()
            .map_err(Error::Network)?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            threads = config.download.threads,
            max_attempts = config.retry.max_attempts,
            archive = archive.as_ref().map(|a| a.name()).unwrap_or("none"),
            transcoder = transcoder.name(),
            "Downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            archive,
            transcoder,
            event_tx,
        })
    }

    /// Subscribe to downloader events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use podcast_dl::{Config, Downloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = Downloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Broadcast an event; having no subscribers is not an error
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
