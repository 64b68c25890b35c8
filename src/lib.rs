//! # podcast-dl
//!
//! Resilient batch download engine for podcast feeds.
//!
//! ## Design Philosophy
//!
//! podcast-dl is designed to be:
//! - **Idempotent** - An archive of keys lets repeated runs skip finished work
//! - **Atomic** - Files appear at their final path only once fully written
//! - **Fault isolated** - One failing episode never stops the rest of a batch
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Feed fetching and parsing happen upstream: callers hand the engine a
//! [`FeedInfo`] and an ordered list of [`WorkItem`]s.
//!
//! ## Quick Start
//!
//! ```no_run
//! use podcast_dl::{Config, Downloader, Enclosure, FeedInfo, WorkItem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.base_path = "podcasts".into();
//!     config.download.threads = 3;
//!     config.archive.path = Some("podcasts/archive.json".into());
//!
//!     let downloader = Downloader::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let feed = FeedInfo {
//!         title: "My Show".to_string(),
//!         link: Some("https://example.com".to_string()),
//!         item_count: 1,
//!     };
//!     let items = vec![WorkItem {
//!         title: "Pilot".to_string(),
//!         guid: "pilot".to_string(),
//!         enclosure: Some(Enclosure {
//!             url: "https://cdn.example.com/pilot.mp3".to_string(),
//!             mime_type: Some("audio/mpeg".to_string()),
//!             length: None,
//!         }),
//!         ..Default::default()
//!     }];
//!
//!     let result = downloader.run_batch(&feed, items).await;
//!     if result.had_errors {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive of already-downloaded keys
pub mod archive;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Sidecar episode metadata
pub mod metadata;
/// Filename templating and sanitization
pub mod naming;
/// Post-processing pipeline
pub mod post_processing;
/// Primary source resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Audio transcoding
pub mod transcode;
/// Core types and events
pub mod types;
/// Utility functions for file operations
pub mod utils;

// Re-export commonly used types
pub use archive::{ArchiveStore, JsonArchive, MemoryArchive};
pub use config::Config;
pub use downloader::{CommitHook, Downloader};
pub use error::{ArchiveError, Error, PostProcessError, Result, TransferError};
pub use post_processing::{PostProcessContext, PostProcessPipeline, PostProcessStep};
pub use transcode::{FfmpegTranscoder, NoOpTranscoder, TranscodeJob, Transcoder};
pub use types::{
    ArchiveKey, BatchResult, Enclosure, Event, FeedInfo, SecondaryDownload, SkipReason,
    TransferOutcome, TransferSpec, WorkItem,
};
