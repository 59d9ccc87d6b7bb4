//! Address list reader.

use std::path::Path;

use crate::error::{Error, Result};

/// Read the address list at `path`, one address per line.
///
/// Lines are trimmed and blank lines skipped. The path must be absolute; a
/// relative path or an unreadable file is a startup error.
pub async fn read_addresses(path: &Path) -> Result<Vec<String>> {
    if !path.is_absolute() {
        return Err(Error::config(
            "source",
            format!("'{}' should be an absolute path to a file", path.display()),
        ));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let addresses = parse_addresses(&content);
    tracing::debug!(path = %path.display(), count = addresses.len(), "read address list");
    Ok(addresses)
}

/// Split text into addresses, skipping blank lines.
pub fn parse_addresses(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
