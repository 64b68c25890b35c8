//! Configuration types for podcast-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Browser-like user agent sent with both the size probe and the body request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Download behavior configuration (paths, concurrency, idempotency, wire settings)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base directory that item paths are resolved against (default: ".")
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Number of items processed concurrently (default: 1)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Re-download even when the destination already exists locally
    #[serde(default)]
    pub override_existing: bool,

    /// Run post-processing for items skipped because they exist locally
    #[serde(default)]
    pub always_postprocess: bool,

    /// Log progress lines while a primary transfer is streaming (default: true)
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Minimum interval between progress notifications (default: 3 seconds)
    #[serde(default = "default_progress_interval", with = "duration_secs")]
    pub progress_interval: Duration,

    /// Timeout for the metadata-only size probe (default: 30 seconds)
    #[serde(default = "default_probe_timeout", with = "duration_secs")]
    pub probe_timeout: Duration,

    /// Maximum time to wait for the response or the next body chunk (None = wait forever)
    #[serde(default, with = "optional_duration_secs")]
    pub read_timeout: Option<Duration>,

    /// User agent for all transfer requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            threads: default_threads(),
            override_existing: false,
            always_postprocess: false,
            show_progress: true,
            progress_interval: default_progress_interval(),
            probe_timeout: default_probe_timeout(),
            read_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient transfer failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per logical transfer, first attempt included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 0, retry immediately)
    #[serde(default, with = "duration_millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: Duration::ZERO,
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Where to look for an item's primary media URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeSource {
    /// The item's enclosure element
    Enclosure,
    /// The item's link element
    Link,
}

/// Filename templating configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Template for episode paths, `/` separates directories
    #[serde(default = "default_episode_template")]
    pub episode_template: String,

    /// Zero-pad `{{episode_num}}` to this width (default: 1)
    #[serde(default = "default_episode_digits")]
    pub episode_digits: usize,

    /// Offset added to `{{episode_num}}`
    #[serde(default)]
    pub episode_num_offset: i64,

    /// Regexes matched against the title, exposed as `{{custom_N}}`
    #[serde(default)]
    pub custom_template_options: Vec<String>,

    /// Strip non-alphanumeric characters from titles
    #[serde(default)]
    pub alphanumeric: bool,

    /// Convert titles to UpperCamelCase
    #[serde(default)]
    pub upper_camel_case: bool,

    /// Source preference for the primary URL (default: enclosure, then link)
    #[serde(default = "default_source_order")]
    pub source_order: Vec<EpisodeSource>,

    /// Maximum length of each path segment in bytes (default: 255)
    #[serde(default = "default_max_filename_length")]
    pub max_filename_length: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            episode_template: default_episode_template(),
            episode_digits: default_episode_digits(),
            episode_num_offset: 0,
            custom_template_options: Vec::new(),
            alphanumeric: false,
            upper_camel_case: false,
            source_order: default_source_order(),
            max_filename_length: default_max_filename_length(),
        }
    }
}

/// Archive (idempotency ledger) configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// JSON archive file; None disables archive checks entirely
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Prefix prepended to every derived archive key
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Post-processing configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PostProcessConfig {
    /// Target audio bitrate passed to the transcoder (e.g. "64k")
    #[serde(default)]
    pub bitrate: Option<String>,

    /// Downmix to a single channel
    #[serde(default)]
    pub mono: bool,

    /// Write feed and item metadata into mp3 tags
    #[serde(default)]
    pub add_mp3_metadata: bool,

    /// Command template run after each committed episode
    #[serde(default)]
    pub exec: Option<String>,

    /// Timeout for the exec command (None = wait forever)
    #[serde(default, with = "optional_duration_secs")]
    pub exec_timeout: Option<Duration>,

    /// Write a `.meta.json` sidecar for every item
    #[serde(default)]
    pub include_episode_meta: bool,

    /// Path to ffmpeg (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

impl PostProcessConfig {
    /// Whether any transcoder-backed step is requested
    pub fn wants_transcode(&self) -> bool {
        self.add_mp3_metadata || self.bitrate.is_some() || self.mono
    }
}

/// Main configuration for [`Downloader`](crate::Downloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) - paths, concurrency, wire settings
/// - [`retry`](RetryConfig) - attempt budget and backoff
/// - [`naming`](NamingConfig) - filename templates
/// - [`archive`](ArchiveConfig) - idempotency ledger
/// - [`post_process`](PostProcessConfig) - transcode, exec, sidecar metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Filename templating
    #[serde(default)]
    pub naming: NamingConfig,

    /// Archive settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Post-processing settings
    #[serde(default)]
    pub post_process: PostProcessConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.threads == 0 {
            return Err(Error::config("threads", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("max_attempts", "must be at least 1"));
        }
        if self.naming.episode_template.trim().is_empty() {
            return Err(Error::config("episode_template", "must not be empty"));
        }
        for (i, pattern) in self.naming.custom_template_options.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(Error::config(
                    format!("custom_template_options[{i}]"),
                    format!("invalid regex: {e}"),
                ));
            }
        }
        Ok(())
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_threads() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_episode_template() -> String {
    "{{release_date}}-{{title}}".to_string()
}

fn default_episode_digits() -> usize {
    1
}

fn default_source_order() -> Vec<EpisodeSource> {
    vec![EpisodeSource::Enclosure, EpisodeSource::Link]
}

fn default_max_filename_length() -> usize {
    255
}

// Duration serialization helpers
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
