//! Data models for Google Drive API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type Drive uses to mark folder objects.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file/folder object.
pub const ENTRY_FIELDS: &str = "id, name, mimeType, parents, webViewLink, createdTime, size";

/// A raw file or folder object as returned by the Drive API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Drive encodes int64 fields as strings.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Option::<Size>::deserialize(deserializer)? {
        Some(Size::Text(s)) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        Some(Size::Number(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}

impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

impl std::fmt::Display for RemoteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        let kind = if self.is_folder() { "folder" } else { "file" };
        write!(f, "{}\t{}\t{}\t{}", self.id, size_str, kind, self.name)
    }
}

/// A remote folder. Never mutated or deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    /// `None` only for the root folder.
    pub parent_id: Option<String>,
    pub web_view_link: Option<String>,
}

impl RemoteFolder {
    /// A handle for a folder known only by its identifier (the configured root).
    pub fn root(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            parent_id: None,
            web_view_link: None,
        }
    }
}

impl From<RemoteEntry> for RemoteFolder {
    fn from(entry: RemoteEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            parent_id: entry.parents.into_iter().next(),
            web_view_link: entry.web_view_link,
        }
    }
}

/// A remote file created by a single upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub mime_type: String,
    pub created_time: Option<DateTime<Utc>>,
    pub web_view_link: Option<String>,
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<RemoteEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[allow(dead_code)]
    pub token_type: String,
    pub expires_in: u64,
}
