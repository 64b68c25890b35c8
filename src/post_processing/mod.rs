//! Post-processing pipeline for committed episodes
//!
//! Steps run after a primary transfer commits, in a fixed order:
//! 1. Transcode - bitrate change, downmix and tag injection (mp3 only)
//! 2. Exec - user command run through the platform shell
//! 3. Completion - counts the item towards the batch result
//!
//! Each step declares whether it applies to the item. The first failing step
//! stops the pipeline; the committed file is never rolled back.

use crate::config::PostProcessConfig;
use crate::downloader::CommitHook;
use crate::error::Result;
use crate::transcode::Transcoder;
use crate::types::{FeedInfo, WorkItem};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

mod completion;
mod exec;
mod transcode;

pub use completion::{BatchCounters, CompletionStep};
pub use exec::ExecStep;
pub use transcode::TranscodeStep;

/// Everything a step may need to know about the committed episode
#[derive(Debug, Clone, Copy)]
pub struct PostProcessContext<'a> {
    /// The source item
    pub item: &'a WorkItem,
    /// Feed-level metadata
    pub feed: &'a FeedInfo,
    /// Absolute path of the committed file
    pub output_path: &'a Path,
    /// Path of the committed file relative to the base directory
    pub relative_path: &'a Path,
    /// URL the file was downloaded from
    pub url: &'a str,
    /// File extension including the leading dot
    pub ext: &'a str,
}

/// One typed post-processing step
#[async_trait]
pub trait PostProcessStep: Send + Sync {
    /// Step name, for logs
    fn name(&self) -> &'static str;

    /// Whether the step should run for this episode
    fn applies(&self, ctx: &PostProcessContext<'_>) -> bool;

    /// Run the step
    async fn run(&self, ctx: &PostProcessContext<'_>) -> Result<()>;
}

/// Ordered list of post-processing steps
#[derive(Default)]
pub struct PostProcessPipeline {
    steps: Vec<Box<dyn PostProcessStep>>,
}

impl PostProcessPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn with_step(mut self, step: impl PostProcessStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The standard pipeline: transcode, exec, then completion
    pub fn for_config(
        config: &PostProcessConfig,
        transcoder: Arc<dyn Transcoder>,
        counters: Arc<BatchCounters>,
    ) -> Self {
        Self::new()
            .with_step(TranscodeStep::new(config, transcoder))
            .with_step(ExecStep::new(config.exec.clone(), config.exec_timeout))
            .with_step(CompletionStep::new(counters))
    }

    /// Names of all steps, in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every applicable step in order, stopping at the first failure
    pub async fn run(&self, ctx: &PostProcessContext<'_>) -> Result<()> {
        for step in &self.steps {
            if !step.applies(ctx) {
                debug!(step = step.name(), "step does not apply, skipping");
                continue;
            }

            debug!(step = step.name(), path = %ctx.output_path.display(), "running step");
            step.run(ctx).await?;
        }
        Ok(())
    }

    /// Bind the pipeline to one episode so it can be handed to a transfer
    pub fn bind<'a>(&'a self, ctx: PostProcessContext<'a>) -> BoundPipeline<'a> {
        BoundPipeline {
            pipeline: self,
            ctx,
        }
    }
}

/// A pipeline bound to one episode, run as a transfer's commit hook
pub struct BoundPipeline<'a> {
    pipeline: &'a PostProcessPipeline,
    ctx: PostProcessContext<'a>,
}

#[async_trait]
impl<'a> CommitHook for BoundPipeline<'a> {
    async fn after_commit(&self) -> Result<()> {
        info!(path = %self.ctx.output_path.display(), "running post-processing");
        self.pipeline.run(&self.ctx).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
