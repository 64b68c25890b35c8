//! Error types for podcast-dl
//!
//! This module provides the error taxonomy for the library:
//! - Transfer errors (stream failures, exhausted retries, archive writes)
//! - Post-processing errors (transcode and external command failures)
//! - Archive store errors
//! - Configuration and source resolution errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for podcast-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podcast-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "threads")
        key: Option<String>,
    },

    /// Transfer-related error
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Post-processing error (transcode, exec)
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// Archive store error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// No download URL could be resolved for an item
    #[error("unable to find episode download URL for {title:?}")]
    UnresolvableSource {
        /// Title of the item that could not be resolved
        title: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (ffmpeg, shell)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Errors raised while materializing a single URL to a local path
#[derive(Debug, Error)]
pub enum TransferError {
    /// The body stream failed on one attempt (network, HTTP status, or write error)
    #[error("attempt {attempt} for {url} failed: {reason}")]
    Stream {
        /// The URL being transferred
        url: String,
        /// The 1-based attempt number that failed
        attempt: u32,
        /// The underlying failure
        reason: String,
    },

    /// Every permitted attempt failed
    #[error("{url} failed after {attempts} attempts: {last_error}")]
    AttemptsExhausted {
        /// The URL being transferred
        url: String,
        /// Total number of attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },

    /// The streamed temp file could not be moved into place
    #[error("failed to commit {temp_path} to {dest_path}: {reason}")]
    CommitFailed {
        /// The temporary file that held the payload
        temp_path: PathBuf,
        /// The final destination path
        dest_path: PathBuf,
        /// The reason the rename failed
        reason: String,
    },

    /// The archive entry could not be recorded after a successful commit
    #[error("error writing to archive: {0}")]
    ArchiveWrite(#[source] ArchiveError),
}

/// Post-processing errors (transcode, external command)
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// Transcoding requested for a file the transcoder cannot handle
    #[error("not an .mp3 file, unable to run ffmpeg on {path}")]
    UnsupportedFormat {
        /// The committed file that was rejected
        path: PathBuf,
    },

    /// Transcoder exited unsuccessfully
    #[error("transcode failed for {path}: {reason}")]
    TranscodeFailed {
        /// The committed file being transcoded
        path: PathBuf,
        /// The reason transcoding failed
        reason: String,
    },

    /// External command exited with a non-zero status
    #[error("command `{command}` failed with exit code {exit_code:?}")]
    CommandFailed {
        /// The expanded command line
        command: String,
        /// Exit code, if the process exited normally
        exit_code: Option<i32>,
    },

    /// External command exceeded its timeout
    #[error("command `{command}` timed out")]
    CommandTimedOut {
        /// The expanded command line
        command: String,
    },

    /// Sidecar metadata could not be written
    #[error("failed to write metadata to {path}: {reason}")]
    MetadataWriteFailed {
        /// Destination of the metadata file
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },
}

/// Archive store errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive file could not be read
    #[error("failed to read archive {path}: {reason}")]
    ReadFailed {
        /// Path of the archive file
        path: PathBuf,
        /// The reason the read failed
        reason: String,
    },

    /// Archive file could not be written
    #[error("failed to write archive {path}: {reason}")]
    WriteFailed {
        /// Path of the archive file
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },

    /// Archive file exists but is not a JSON array of keys
    #[error("archive {path} is corrupt: {reason}")]
    Corrupt {
        /// Path of the archive file
        path: PathBuf,
        /// The parse failure
        reason: String,
    },
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transfer(e) => match e {
                TransferError::Stream { .. } => "stream_failed",
                TransferError::AttemptsExhausted { .. } => "attempts_exhausted",
                TransferError::CommitFailed { .. } => "commit_failed",
                TransferError::ArchiveWrite(_) => "archive_write_failed",
            },
            Error::PostProcess(e) => match e {
                PostProcessError::UnsupportedFormat { .. } => "unsupported_format",
                PostProcessError::TranscodeFailed { .. } => "transcode_failed",
                PostProcessError::CommandFailed { .. } => "command_failed",
                PostProcessError::CommandTimedOut { .. } => "command_timed_out",
                PostProcessError::MetadataWriteFailed { .. } => "metadata_write_failed",
            },
            Error::Archive(_) => "archive_error",
            Error::UnresolvableSource { .. } => "unresolvable_source",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_write_error_keeps_context_in_message() {
        let err = Error::Transfer(TransferError::ArchiveWrite(ArchiveError::WriteFailed {
            path: PathBuf::from("/tmp/archive.json"),
            reason: "read-only file system".into(),
        }));

        let msg = err.to_string();
        assert!(msg.contains("error writing to archive"), "got: {msg}");
        assert_eq!(err.error_code(), "archive_write_failed");
    }

    #[test]
    fn attempts_exhausted_reports_count_and_last_error() {
        let err: Error = TransferError::AttemptsExhausted {
            url: "https://example.com/ep.mp3".into(),
            attempts: 3,
            last_error: "connection reset".into(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "transfer error: https://example.com/ep.mp3 failed after 3 attempts: connection reset"
        );
    }

    #[test]
    fn config_helper_sets_key() {
        match Error::config("threads", "must be at least 1") {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("threads"));
                assert_eq!(message, "must be at least 1");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn string_variants_have_distinct_codes() {
        let codes = [
            Error::ExternalTool("ffmpeg exited".into()).error_code(),
            Error::NotSupported("transcoding".into()).error_code(),
            Error::Io(std::io::Error::other("disk")).error_code(),
            Error::config("threads", "zero").error_code(),
        ];
        assert_eq!(
            codes,
            ["external_tool_error", "not_supported", "io_error", "config_error"]
        );
    }

    #[test]
    fn unresolvable_source_has_its_own_code() {
        let err = Error::UnresolvableSource {
            title: "Episode 1".into(),
        };
        assert_eq!(err.error_code(), "unresolvable_source");
        assert!(err.to_string().contains("Episode 1"));
    }
}
