//! Utility functions for file operations

use std::path::Path;
use tracing::warn;

/// Whether `path` exists; errors while checking count as absent
pub async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Remove a leftover file, logging any failure other than it already being gone
///
/// Used to clean up staging files (`<dest>.tmp`, transcoder output) after a
/// failed write. Cleanup never masks the error that caused it, so failures
/// are logged rather than returned.
pub async fn remove_if_present(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove temporary file");
    }
}
