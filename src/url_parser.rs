//! Root folder parsing: a Drive folder URL or a bare folder ID.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// `https://drive.google.com/drive[/u/N]/folders/<ID>` or `.../open?id=<ID>`.
static FOLDER_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://drive\.google\.com/(?:drive/(?:u/\d+/)?folders/|open\?id=)([a-zA-Z0-9_-]+)",
    )
    .expect("Invalid folder URL regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Resolve the configured root folder to a bare folder ID.
///
/// File links (`/file/d/<ID>`) are rejected: uploads need a folder parent.
///
/// ```
/// use drive_backup::url_parser::parse_folder_id;
///
/// let id = parse_folder_id("https://drive.google.com/drive/folders/1abc123").unwrap();
/// assert_eq!(id, "1abc123");
/// assert_eq!(parse_folder_id("1abc123").unwrap(), "1abc123");
/// ```
pub fn parse_folder_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    if let Some(id) = FOLDER_URL_REGEX
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
    {
        return Ok(id.as_str().to_string());
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(url_or_id.to_string()))
}
