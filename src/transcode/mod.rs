//! Audio transcoding
//!
//! The [`Transcoder`] trait is the seam between the post-processing pipeline
//! and whatever rewrites committed audio files. Two implementations are
//! provided:
//!
//! - [`FfmpegTranscoder`]: runs an external `ffmpeg` binary
//! - [`NoOpTranscoder`]: stub used when ffmpeg is unavailable
//!
//! ## Usage
//!
//! ```no_run
//! use podcast_dl::transcode::{FfmpegTranscoder, TranscodeJob, Transcoder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ffmpeg = FfmpegTranscoder::from_path().expect("ffmpeg not found");
//!
//!     let job = TranscodeJob {
//!         input: "episode.mp3".into(),
//!         output: "episode.mp3.tmp.mp3".into(),
//!         bitrate: Some("64k".into()),
//!         mono: true,
//!         tags: vec![("title".into(), "Pilot".into())],
//!     };
//!     ffmpeg.transcode(&job).await?;
//!     Ok(())
//! }
//! ```

mod ffmpeg;
mod noop;
mod traits;

pub use ffmpeg::FfmpegTranscoder;
pub use noop::NoOpTranscoder;
pub use traits::{TranscodeJob, Transcoder};
