//! Batch download example
//!
//! Downloads every item listed in a JSON batch file:
//!
//! ```bash
//! cargo run --example batch_download -- batch.json [config.json]
//! ```
//!
//! `batch.json` holds the feed metadata and its items:
//!
//! ```json
//! {
//!   "feed": { "title": "My Show", "link": "https://example.com", "item_count": 1 },
//!   "items": [
//!     {
//!       "title": "Pilot",
//!       "guid": "pilot",
//!       "original_index": 0,
//!       "pub_date": "2024-01-01T00:00:00Z",
//!       "enclosure": { "url": "https://cdn.example.com/pilot.mp3", "mime_type": "audio/mpeg" }
//!     }
//!   ]
//! }
//! ```
//!
//! Set `RUST_LOG=podcast_dl=debug` for more detail.

use podcast_dl::{Config, Downloader, Event, FeedInfo, WorkItem};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct Batch {
    feed: FeedInfo,
    items: Vec<WorkItem>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("podcast_dl=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let batch_path = args.next().ok_or("usage: batch_download <batch.json> [config.json]")?;
    let config = match args.next() {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let batch: Batch = serde_json::from_str(&std::fs::read_to_string(batch_path)?)?;

    let downloader = Downloader::new(config).await?;

    // Subscribe to events
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::TransferComplete { marker, path } => {
                    println!("done     {} -> {}", marker, path.display());
                }
                Event::TransferSkipped { marker, reason } => {
                    println!("skipped  {} ({:?})", marker, reason);
                }
                Event::ItemFailed { marker, error } => {
                    println!("failed   {}: {}", marker, error);
                }
                _ => {}
            }
        }
    });

    let result = downloader.run_batch(&batch.feed, batch.items).await;
    println!(
        "{} episode(s) completed{}",
        result.completed_count,
        if result.had_errors { ", with errors" } else { "" }
    );

    if result.had_errors {
        std::process::exit(1);
    }
    Ok(())
}
