//! Traits and types for audio transcoding

use async_trait::async_trait;
use std::path::PathBuf;

/// One transcoder invocation
///
/// The input is never modified; the result is written to `output`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Committed file to read
    pub input: PathBuf,
    /// Where the transcoded file is written
    pub output: PathBuf,
    /// Target audio bitrate (e.g. "64k")
    pub bitrate: Option<String>,
    /// Downmix to one channel
    pub mono: bool,
    /// Tags to embed, in order
    pub tags: Vec<(String, String)>,
}

impl TranscodeJob {
    /// Whether the audio stream can be copied untouched
    pub fn is_stream_copy(&self) -> bool {
        self.bitrate.is_none() && !self.mono
    }
}

/// Trait for audio transcoders
///
/// Implementations must leave `job.input` untouched and either produce
/// `job.output` or return an error.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run the job to completion
    async fn transcode(&self, job: &TranscodeJob) -> crate::Result<()>;

    /// Implementation name, for logs
    fn name(&self) -> &'static str;
}
