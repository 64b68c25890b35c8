use super::*;
use crate::error::{Error, PostProcessError};
use crate::transcode::TranscodeJob;
use crate::types::BatchResult;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Transcoder that writes a fixed payload and records every job
#[derive(Default)]
struct RecordingTranscoder {
    jobs: Mutex<Vec<TranscodeJob>>,
    fail: bool,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> Result<()> {
        self.jobs.lock().unwrap().push(job.clone());
        // write partial output first so cleanup can be observed
        tokio::fs::write(&job.output, b"transcoded").await?;
        if self.fail {
            return Err(PostProcessError::TranscodeFailed {
                path: job.input.clone(),
                reason: "boom".into(),
            }
            .into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct Fixture {
    _dir: TempDir,
    item: WorkItem,
    feed: FeedInfo,
    output_path: PathBuf,
    relative_path: PathBuf,
}

impl Fixture {
    fn new(filename: &str) -> Self {
        let dir = tempdir().unwrap();
        let relative_path = PathBuf::from("Show").join(filename);
        let output_path = dir.path().join(&relative_path);
        std::fs::create_dir_all(output_path.parent().unwrap()).unwrap();
        std::fs::write(&output_path, b"original").unwrap();

        Self {
            _dir: dir,
            item: WorkItem {
                title: "Pilot".into(),
                guid: "g-1".into(),
                original_index: 2,
                pub_date: Some(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap()),
                subtitle: Some("  ".into()),
                description_text: Some("The first one".into()),
                ..Default::default()
            },
            feed: FeedInfo {
                title: "My Show".into(),
                link: None,
                item_count: 10,
            },
            output_path,
            relative_path,
        }
    }

    fn ctx(&self) -> PostProcessContext<'_> {
        PostProcessContext {
            item: &self.item,
            feed: &self.feed,
            output_path: &self.output_path,
            relative_path: &self.relative_path,
            url: "https://cdn.example.com/pilot.mp3",
            ext: ".mp3",
        }
    }

    fn staging_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.tmp.mp3", self.output_path.display()))
    }
}

fn counters() -> Arc<BatchCounters> {
    Arc::new(BatchCounters::default())
}

#[test]
fn standard_pipeline_order() {
    let pipeline = PostProcessPipeline::for_config(
        &PostProcessConfig::default(),
        Arc::new(RecordingTranscoder::default()),
        counters(),
    );
    assert_eq!(pipeline.step_names(), vec!["transcode", "exec", "completion"]);
}

#[tokio::test]
async fn no_options_only_counts_completion() {
    let fixture = Fixture::new("pilot.mp3");
    let transcoder = Arc::new(RecordingTranscoder::default());
    let counters = counters();
    let pipeline = PostProcessPipeline::for_config(
        &PostProcessConfig::default(),
        transcoder.clone(),
        counters.clone(),
    );

    pipeline.run(&fixture.ctx()).await.unwrap();

    assert!(transcoder.jobs.lock().unwrap().is_empty());
    assert_eq!(
        counters.snapshot(),
        BatchResult {
            completed_count: 1,
            had_errors: false
        }
    );
}

#[tokio::test]
async fn transcode_replaces_committed_file() {
    let fixture = Fixture::new("pilot.mp3");
    let transcoder = Arc::new(RecordingTranscoder::default());
    let config = PostProcessConfig {
        bitrate: Some("64k".into()),
        add_mp3_metadata: true,
        ..Default::default()
    };
    let pipeline = PostProcessPipeline::for_config(&config, transcoder.clone(), counters());

    pipeline.run(&fixture.ctx()).await.unwrap();

    assert_eq!(std::fs::read(&fixture.output_path).unwrap(), b"transcoded");
    assert!(!fixture.staging_path().exists());

    let jobs = transcoder.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].input, fixture.output_path);
    assert_eq!(jobs[0].output, fixture.staging_path());
    assert_eq!(jobs[0].bitrate.as_deref(), Some("64k"));
    assert!(jobs[0].tags.contains(&("album".to_string(), "My Show".to_string())));
}

#[tokio::test]
async fn transcode_rejects_non_mp3() {
    let fixture = Fixture::new("pilot.m4a");
    let counters = counters();
    let config = PostProcessConfig {
        mono: true,
        ..Default::default()
    };
    let pipeline = PostProcessPipeline::for_config(
        &config,
        Arc::new(RecordingTranscoder::default()),
        counters.clone(),
    );

    let err = pipeline.run(&fixture.ctx()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::PostProcess(PostProcessError::UnsupportedFormat { .. })
    ));
    assert_eq!(counters.snapshot().completed_count, 0);
    // committed file is left alone
    assert_eq!(std::fs::read(&fixture.output_path).unwrap(), b"original");
}

#[tokio::test]
async fn transcoder_failure_cleans_staging_and_skips_completion() {
    let fixture = Fixture::new("pilot.mp3");
    let counters = counters();
    let transcoder = Arc::new(RecordingTranscoder {
        fail: true,
        ..Default::default()
    });
    let config = PostProcessConfig {
        mono: true,
        ..Default::default()
    };
    let pipeline = PostProcessPipeline::for_config(&config, transcoder, counters.clone());

    assert!(pipeline.run(&fixture.ctx()).await.is_err());
    assert!(!fixture.staging_path().exists());
    assert_eq!(std::fs::read(&fixture.output_path).unwrap(), b"original");
    assert_eq!(counters.snapshot().completed_count, 0);
}

#[test]
fn mp3_tags_skip_blank_values_and_derive_track() {
    let fixture = Fixture::new("pilot.mp3");
    let tags = transcode::mp3_tags(&fixture.ctx());

    let keys: Vec<&str> = tags.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["album", "artist", "title", "comment", "track", "date"]);

    // 10 items, index 2 => episode 8
    assert!(tags.contains(&("track".to_string(), "8".to_string())));
    assert!(tags.contains(&("date".to_string(), "2024-05-06".to_string())));
}

#[test]
fn exec_placeholders_become_variable_references() {
    let expanded =
        ExecStep::expand("cp {{episode_path}} /backup && echo {{episode_filename_base}} {{url}}");

    if cfg!(windows) {
        assert_eq!(
            expanded,
            "cp \"%EPISODE_PATH%\" /backup && echo \"%EPISODE_FILENAME_BASE%\" \"%EPISODE_URL%\""
        );
    } else {
        assert_eq!(
            expanded,
            "cp \"$EPISODE_PATH\" /backup && echo \"$EPISODE_FILENAME_BASE\" \"$EPISODE_URL\""
        );
    }
    assert_eq!(ExecStep::expand("{{unknown}} {{title}}"), "{{unknown}} {{title}}");
}

#[test]
fn exec_env_carries_episode_values() {
    let fixture = Fixture::new("pilot.mp3");
    let env = ExecStep::env(&fixture.ctx());
    let value = |name: &str| {
        env.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };

    assert_eq!(value("EPISODE_PATH"), fixture.output_path.display().to_string());
    assert_eq!(
        value("EPISODE_PATH_BASE"),
        fixture.output_path.parent().unwrap().display().to_string()
    );
    assert_eq!(
        value("EPISODE_FILENAME_BASE"),
        PathBuf::from("Show/pilot").display().to_string()
    );
    assert_eq!(value("EPISODE_URL"), "https://cdn.example.com/pilot.mp3");
}

#[test]
fn exec_applies_only_with_template() {
    let fixture = Fixture::new("pilot.mp3");
    assert!(!ExecStep::new(None, None).applies(&fixture.ctx()));
    assert!(!ExecStep::new(Some("   ".into()), None).applies(&fixture.ctx()));
    assert!(ExecStep::new(Some("true".into()), None).applies(&fixture.ctx()));
}

#[cfg(unix)]
#[tokio::test]
async fn exec_runs_through_shell() {
    let fixture = Fixture::new("pilot.mp3");
    let step = ExecStep::new(Some("touch {{episode_path}}.done".into()), None);

    step.run(&fixture.ctx()).await.unwrap();

    let marker = PathBuf::from(format!("{}.done", fixture.output_path.display()));
    assert!(marker.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn exec_does_not_evaluate_shell_syntax_in_values() {
    let filename = "Ep $(touch injected) `touch ticked` $HOME.mp3";
    let fixture = Fixture::new(filename);
    let show_dir = fixture.output_path.parent().unwrap().to_path_buf();
    let step = ExecStep::new(
        Some("cd {{episode_path_base}} && printf '%s' {{episode_filename}} > seen.txt".into()),
        None,
    );

    step.run(&fixture.ctx()).await.unwrap();

    assert!(!show_dir.join("injected").exists());
    assert!(!show_dir.join("ticked").exists());
    let seen = std::fs::read_to_string(show_dir.join("seen.txt")).unwrap();
    assert_eq!(seen, format!("Show/{filename}"));
}

#[cfg(unix)]
#[tokio::test]
async fn exec_nonzero_exit_fails_the_pipeline() {
    let fixture = Fixture::new("pilot.mp3");
    let counters = counters();
    let config = PostProcessConfig {
        exec: Some("exit 3".into()),
        ..Default::default()
    };
    let pipeline = PostProcessPipeline::for_config(
        &config,
        Arc::new(RecordingTranscoder::default()),
        counters.clone(),
    );

    let err = pipeline.run(&fixture.ctx()).await.unwrap_err();

    match err {
        Error::PostProcess(PostProcessError::CommandFailed { exit_code, .. }) => {
            assert_eq!(exit_code, Some(3));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(counters.snapshot().completed_count, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn exec_timeout_is_enforced() {
    let fixture = Fixture::new("pilot.mp3");
    let step = ExecStep::new(Some("sleep 5".into()), Some(Duration::from_millis(100)));

    let start = std::time::Instant::now();
    let err = step.run(&fixture.ctx()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::PostProcess(PostProcessError::CommandTimedOut { .. })
    ));
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn bound_pipeline_runs_as_commit_hook() {
    let fixture = Fixture::new("pilot.mp3");
    let counters = counters();
    let pipeline = PostProcessPipeline::new().with_step(CompletionStep::new(counters.clone()));

    let hook = pipeline.bind(fixture.ctx());
    hook.after_commit().await.unwrap();
    hook.after_commit().await.unwrap();

    assert_eq!(counters.snapshot().completed_count, 2);
}

#[test]
fn counters_record_errors_independently() {
    let counters = BatchCounters::default();
    counters.record_error();
    counters.record_error();

    assert_eq!(
        counters.snapshot(),
        BatchResult {
            completed_count: 0,
            had_errors: true
        }
    );
}
