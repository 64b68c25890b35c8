//! Filename templating and archive key derivation
//!
//! Templates are `/`-separated path segments containing `{{token}}`
//! placeholders. Each segment is expanded and sanitized independently, so a
//! title containing `/` can never escape its directory.

use crate::config::NamingConfig;
use crate::types::{ArchiveKey, FeedInfo, WorkItem};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

const INVALID_CHAR_REPLACE: char = '_';

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap()
});

static RESERVED_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).unwrap()
});

static REPEATED_REPLACEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"_{2,}").unwrap()
});

static WORD_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b\w").unwrap()
});

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make `name` safe to use as a single path segment
///
/// Reserved and control characters become `_`, runs of `_` collapse, outer
/// `_` and whitespace are stripped, and the result is truncated to at most `max_len` bytes
/// on a character boundary.
///
/// # Examples
///
/// ```
/// use podcast_dl::naming::safe_name;
///
/// assert_eq!(safe_name("AC/DC: Live?", 255), "AC_DC_ Live");
/// assert_eq!(safe_name("..", 255), "_");
/// ```
#[must_use]
pub fn safe_name(name: &str, max_len: usize) -> String {
    if name == "." || name == ".." {
        return INVALID_CHAR_REPLACE.to_string();
    }

    let replaced = RESERVED_RE.replace_all(name, "_");
    let collapsed = REPEATED_REPLACEMENT_RE.replace_all(&replaced, "_");
    let mut safe = if collapsed.chars().count() > 1 {
        collapsed
            .trim_matches(|c: char| c == INVALID_CHAR_REPLACE || c.is_whitespace())
            .to_string()
    } else {
        collapsed.into_owned()
    };

    let stem = safe.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_RESERVED.contains(&stem.as_str()) {
        safe.push(INVALID_CHAR_REPLACE);
    }

    truncate_bytes(&safe, max_len).to_string()
}

/// `safe_name` for the stem, then append `ext` within the same length budget
#[must_use]
pub fn simple_filename(name: &str, ext: &str, max_len: usize) -> String {
    let stem = safe_name(name, max_len.saturating_sub(ext.len()));
    format!("{stem}{ext}")
}

fn truncate_bytes(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn strip_special_chars(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn to_upper_camel_case(s: &str) -> String {
    WORD_START_RE
        .replace_all(s, |caps: &regex::Captures<'_>| caps[0].to_uppercase())
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn transform_title(title: &str, naming: &NamingConfig) -> String {
    match (naming.alphanumeric, naming.upper_camel_case) {
        (true, true) => to_upper_camel_case(&strip_special_chars(title)),
        (true, false) => strip_special_chars(title),
        (false, true) => to_upper_camel_case(title),
        (false, false) => title.to_string(),
    }
}

/// Episode number counted from the oldest item (oldest = 1 before offset)
pub fn episode_number(item: &WorkItem, feed: &FeedInfo, offset: i64) -> i64 {
    feed.item_count as i64 - item.original_index as i64 + offset
}

fn format_date(date: Option<&DateTime<Utc>>, fmt: &str) -> String {
    date.map(|d| d.format(fmt).to_string()).unwrap_or_default()
}

/// Expand every known `{{token}}` in `segment`, leaving unknown tokens intact
fn expand_tokens(segment: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    TOKEN_RE
        .replace_all(segment, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Relative path for an item's file, derived from the episode template
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use podcast_dl::config::NamingConfig;
/// use podcast_dl::naming::item_filename;
/// use podcast_dl::{FeedInfo, WorkItem};
///
/// let feed = FeedInfo { title: "Show".into(), link: None, item_count: 10 };
/// let item = WorkItem {
///     title: "Pilot".into(),
///     guid: "g1".into(),
///     original_index: 9,
///     pub_date: Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
///     ..Default::default()
/// };
/// let naming = NamingConfig {
///     episode_template: "{{podcast_title}}/{{episode_num}} {{title}}".into(),
///     episode_digits: 3,
///     ..Default::default()
/// };
///
/// let path = item_filename(&item, &feed, "https://cdn/p.mp3", ".mp3", &naming);
/// assert_eq!(path, std::path::PathBuf::from("Show/001 Pilot.mp3"));
/// ```
pub fn item_filename(
    item: &WorkItem,
    feed: &FeedInfo,
    url: &str,
    ext: &str,
    naming: &NamingConfig,
) -> PathBuf {
    let title = transform_title(&item.title, naming);
    let podcast_title = transform_title(&feed.title, naming);
    let episode_num = episode_number(item, feed, naming.episode_num_offset);
    let width = naming.episode_digits;
    let pub_date = item.pub_date.as_ref();

    let custom: Vec<String> = naming
        .custom_template_options
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .ok()
                .and_then(|re| re.find(&title).map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        })
        .collect();

    let lookup = |token: &str| -> Option<String> {
        let value = match token {
            "title" => title.clone(),
            "release_date" => format_date(pub_date, "%Y%m%d"),
            "release_year" => format_date(pub_date, "%Y"),
            "release_month" => format_date(pub_date, "%m"),
            "release_day" => format_date(pub_date, "%d"),
            "episode_num" => format!("{episode_num:0width$}"),
            "url" => url.to_string(),
            "podcast_title" => podcast_title.clone(),
            "podcast_link" => feed.link.clone().unwrap_or_default(),
            "duration" => item.duration.clone().unwrap_or_default(),
            "guid" => item.guid.clone(),
            other => {
                let index: usize = other.strip_prefix("custom_")?.parse().ok()?;
                custom.get(index).cloned().unwrap_or_default()
            }
        };
        Some(value)
    };

    let max_len = naming.max_filename_length;
    let segments: Vec<&str> = naming.episode_template.trim().split('/').collect();
    let last = segments.len().saturating_sub(1);

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let expanded = expand_tokens(segment, &lookup);
            if i == last {
                simple_filename(&expanded, ext, max_len)
            } else {
                safe_name(&expanded, max_len)
            }
        })
        .collect()
}

/// Expand a folder template with feed-level tokens only
pub fn folder_name(feed: &FeedInfo, template: &str, max_len: usize) -> String {
    expand_tokens(template, |token| match token {
        "podcast_title" => Some(safe_name(&feed.title, max_len)),
        "podcast_link" => Some(safe_name(feed.link.as_deref().unwrap_or_default(), max_len)),
        _ => None,
    })
}

/// Name used for archive keys: `YYYYMMDD-name` + `ext`, or `name` + `ext` without a date
pub fn archive_filename(pub_date: Option<&DateTime<Utc>>, name: &str, ext: &str) -> String {
    match pub_date {
        Some(date) => format!("{}-{}{}", date.format("%Y%m%d"), name, ext),
        None => format!("{name}{ext}"),
    }
}

/// Compose an archive key from an optional prefix and a derived name
pub fn archive_key(prefix: Option<&str>, name: &str) -> ArchiveKey {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => ArchiveKey(format!("{prefix}-{name}")),
        None => ArchiveKey(name.to_string()),
    }
}
