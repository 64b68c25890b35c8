//! Archive of already-downloaded keys
//!
//! The archive is the idempotency ledger that lets repeated runs skip work.
//! The core abstraction is the [`ArchiveStore`] trait, with two implementations:
//!
//! - [`JsonArchive`]: a JSON array of keys persisted to disk
//! - [`MemoryArchive`]: an in-process set for tests and one-off runs
//!
//! Membership tests and appends are separate calls, so two concurrent
//! transfers deriving the same key may both miss the archive and both
//! download. Keys are derived from per-item title and date, so this is not
//! guarded further. Appends are insert-if-absent, so the ledger itself never
//! holds a duplicate.
//!
//! ## Usage
//!
//! ```no_run
//! use podcast_dl::archive::{ArchiveStore, JsonArchive};
//! use podcast_dl::ArchiveKey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archive = JsonArchive::open("archive.json").await?;
//!     let key = ArchiveKey::new("show-20240101-Episode 1.mp3");
//!
//!     if !archive.contains(&key).await? {
//!         // ... download ...
//!         archive.append(&key).await?;
//!     }
//!     Ok(())
//! }
//! ```

mod json;
mod memory;
mod traits;

pub use json::JsonArchive;
pub use memory::MemoryArchive;
pub use traits::ArchiveStore;
