//! No-op transcoder for graceful degradation

use super::traits::{TranscodeJob, Transcoder};
use async_trait::async_trait;

/// Transcoder used when no ffmpeg binary is available
///
/// Every job fails with `Error::NotSupported`, which surfaces as an
/// item-level failure for items that requested transcoding. Items that did
/// not request it never reach the transcoder.
///
/// # Examples
///
/// ```
/// use podcast_dl::transcode::{NoOpTranscoder, TranscodeJob, Transcoder};
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = NoOpTranscoder.transcode(&TranscodeJob::default()).await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct NoOpTranscoder;

#[async_trait]
impl Transcoder for NoOpTranscoder {
    async fn transcode(&self, _job: &TranscodeJob) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "transcoding requires an external ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
