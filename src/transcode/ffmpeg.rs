//! ffmpeg-backed transcoder

use super::traits::{TranscodeJob, Transcoder};
use crate::error::PostProcessError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command;

/// Transcoder that shells out to `ffmpeg`
///
/// # Examples
///
/// ```no_run
/// use podcast_dl::transcode::FfmpegTranscoder;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let ffmpeg = FfmpegTranscoder::new(PathBuf::from("/usr/bin/ffmpeg"));
///
/// // Or auto-discover from PATH
/// let ffmpeg = FfmpegTranscoder::from_path().expect("ffmpeg not found in PATH");
/// ```
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Command-line arguments for a job, binary excluded
    pub(crate) fn args(job: &TranscodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-loglevel".into(),
            "quiet".into(),
            "-i".into(),
            job.input.clone().into(),
        ];

        if let Some(bitrate) = &job.bitrate {
            args.push("-b:a".into());
            args.push(bitrate.into());
        }

        if job.mono {
            args.push("-ac".into());
            args.push("1".into());
        }

        if !job.tags.is_empty() {
            args.push("-map_metadata".into());
            args.push("0".into());
            for (key, value) in &job.tags {
                args.push("-metadata".into());
                args.push(format!("{key}={value}").into());
            }
        }

        if job.is_stream_copy() {
            args.push("-codec".into());
            args.push("copy".into());
        }

        args.push(job.output.clone().into());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> crate::Result<()> {
        let output = Command::new(&self.binary_path)
            .args(Self::args(job))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PostProcessError::TranscodeFailed {
                path: job.input.clone(),
                reason: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            }
            .into());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
