//! Transcode and tagging step

use super::{PostProcessContext, PostProcessStep};
use crate::config::PostProcessConfig;
use crate::error::{PostProcessError, Result};
use crate::naming::episode_number;
use crate::transcode::{TranscodeJob, Transcoder};
use crate::utils::remove_if_present;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Rewrites committed mp3 files through a [`Transcoder`]
///
/// Applies when a bitrate, a mono downmix or tag injection is requested.
/// The transcoder writes to `<path>.tmp<ext>`, which then replaces the
/// committed file; the staging file is removed on failure.
pub struct TranscodeStep {
    bitrate: Option<String>,
    mono: bool,
    add_metadata: bool,
    transcoder: Arc<dyn Transcoder>,
}

impl TranscodeStep {
    /// Create a transcode step from the post-processing settings
    pub fn new(config: &PostProcessConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            bitrate: config.bitrate.clone(),
            mono: config.mono,
            add_metadata: config.add_mp3_metadata,
            transcoder,
        }
    }

    fn staging_path(path: &Path, ext: &str) -> PathBuf {
        let mut os: OsString = path.as_os_str().to_os_string();
        os.push(".tmp");
        os.push(ext);
        PathBuf::from(os)
    }
}

/// Tags embedded in the episode file, skipping empty values
pub fn mp3_tags(ctx: &PostProcessContext<'_>) -> Vec<(String, String)> {
    let item = ctx.item;
    let track = item
        .episode
        .clone()
        .unwrap_or_else(|| episode_number(item, ctx.feed, 0).to_string());

    let candidates = [
        ("album", Some(ctx.feed.title.clone())),
        ("artist", item.author.clone().or_else(|| Some(ctx.feed.title.clone()))),
        ("title", Some(item.title.clone())),
        ("subtitle", item.subtitle.clone()),
        (
            "comment",
            item.description_text.clone().or_else(|| item.description.clone()),
        ),
        ("disc", item.season.clone()),
        ("track", Some(track)),
        ("episode_type", item.episode_type.clone()),
        ("date", item.pub_date.map(|d| d.format("%Y-%m-%d").to_string())),
    ];

    candidates
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key.to_string(), v))
        })
        .collect()
}

#[async_trait]
impl PostProcessStep for TranscodeStep {
    fn name(&self) -> &'static str {
        "transcode"
    }

    fn applies(&self, _ctx: &PostProcessContext<'_>) -> bool {
        self.add_metadata || self.bitrate.is_some() || self.mono
    }

    async fn run(&self, ctx: &PostProcessContext<'_>) -> Result<()> {
        let is_mp3 = ctx
            .output_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
        if !is_mp3 {
            return Err(PostProcessError::UnsupportedFormat {
                path: ctx.output_path.to_path_buf(),
            }
            .into());
        }

        let staging = Self::staging_path(ctx.output_path, ctx.ext);
        let job = TranscodeJob {
            input: ctx.output_path.to_path_buf(),
            output: staging.clone(),
            bitrate: self.bitrate.clone(),
            mono: self.mono,
            tags: if self.add_metadata { mp3_tags(ctx) } else { Vec::new() },
        };

        info!(transcoder = self.transcoder.name(), path = %ctx.output_path.display(), "Running ffmpeg...");

        if let Err(e) = self.transcoder.transcode(&job).await {
            remove_if_present(&staging).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&staging, ctx.output_path).await {
            remove_if_present(&staging).await;
            return Err(PostProcessError::TranscodeFailed {
                path: ctx.output_path.to_path_buf(),
                reason: format!("failed to replace original: {}", e),
            }
            .into());
        }

        Ok(())
    }
}
