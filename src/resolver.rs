//! Primary source resolution for work items
//!
//! Picks the URL an item's episode is downloaded from and the file extension
//! used for naming, trying sources in the configured preference order.

use crate::config::EpisodeSource;
use crate::types::{Enclosure, WorkItem};
use url::Url;

/// Extensions accepted from a URL path without further evidence
const MEDIA_EXTENSIONS: &[&str] = &[
    ".mp3", ".m4a", ".m4b", ".aac", ".ogg", ".oga", ".opus", ".wav", ".flac", ".wma", ".mp4",
    ".m4v", ".mov", ".webm", ".mkv", ".avi",
];

/// Fallback for `audio/*` enclosures whose subtype is not mapped
const DEFAULT_AUDIO_EXT: &str = ".mp3";

/// A resolved primary source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Download URL
    pub url: String,
    /// File extension including the leading dot
    pub ext: String,
}

/// Resolve the primary URL and extension of `item`, or None when no source qualifies
///
/// # Examples
///
/// ```
/// use podcast_dl::config::EpisodeSource;
/// use podcast_dl::resolver::resolve_source;
/// use podcast_dl::{Enclosure, WorkItem};
///
/// let item = WorkItem {
///     title: "Ep".into(),
///     enclosure: Some(Enclosure {
///         url: "https://cdn.example.com/stream?id=7".into(),
///         mime_type: Some("audio/mp4".into()),
///         length: None,
///     }),
///     ..Default::default()
/// };
///
/// let source = resolve_source(&item, &[EpisodeSource::Enclosure]).unwrap();
/// assert_eq!(source.ext, ".m4a");
/// ```
pub fn resolve_source(item: &WorkItem, order: &[EpisodeSource]) -> Option<ResolvedSource> {
    order.iter().find_map(|source| match source {
        EpisodeSource::Enclosure => item.enclosure.as_ref().and_then(from_enclosure),
        EpisodeSource::Link => item.link.as_deref().and_then(from_link),
    })
}

fn from_link(link: &str) -> Option<ResolvedSource> {
    let ext = url_extension(link)?;
    Some(ResolvedSource {
        url: link.to_string(),
        ext,
    })
}

fn from_enclosure(enclosure: &Enclosure) -> Option<ResolvedSource> {
    if enclosure.url.trim().is_empty() {
        return None;
    }

    let ext = url_extension(&enclosure.url)
        .or_else(|| enclosure.mime_type.as_deref().and_then(mime_extension))?;

    Some(ResolvedSource {
        url: enclosure.url.clone(),
        ext,
    })
}

/// Known media extension of the URL's path, lowercased
fn url_extension(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot = last_segment.rfind('.')?;
    let ext = last_segment[dot..].to_ascii_lowercase();

    MEDIA_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn mime_extension(mime: &str) -> Option<String> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "audio/mpeg" | "audio/mp3" | "audio/mpeg3" | "audio/x-mpeg" => ".mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => ".m4a",
        "audio/x-m4b" => ".m4b",
        "audio/aac" | "audio/aacp" => ".aac",
        "audio/ogg" | "audio/vorbis" => ".ogg",
        "audio/opus" => ".opus",
        "audio/wav" | "audio/x-wav" | "audio/wave" => ".wav",
        "audio/flac" | "audio/x-flac" => ".flac",
        "audio/x-ms-wma" => ".wma",
        "video/mp4" => ".mp4",
        "video/x-m4v" => ".m4v",
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        other if other.starts_with("audio/") => DEFAULT_AUDIO_EXT,
        _ => return None,
    };
    Some(ext.to_string())
}
