//! Runtime settings: compiled-in defaults, overridable by flags or environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::upload::ContentTypePolicy;
use crate::url_parser::parse_folder_id;

/// Service account key used when `GOOGLE_DRIVE_KEY_PATH` is unset.
pub const DEFAULT_KEY_PATH: &str = "/data/nexusclaw42-gdrive-key.json";

/// Top-level Drive folder all content is organized under.
pub const DEFAULT_ROOT_FOLDER_ID: &str = "1U246YmyqsSQLJfzgbEVOhKO5lQ-TOCVb";

/// Local directory mirrored by the daily backup.
pub const DEFAULT_SOURCE_DIR: &str = "/data/.openclaw/workspace/memory";

/// Parent folder of the dated backup folders.
pub const BACKUPS_FOLDER: &str = "Backups";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Drive REST endpoints. Overridden in tests to point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Both APIs served from one host, the way a mock server exposes them.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: format!("{}/drive/v3", base),
            upload_base: format!("{}/upload/drive/v3", base),
        }
    }
}

/// Backup/sync settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_DRIVE_KEY_PATH", default_value = DEFAULT_KEY_PATH)]
    pub key_path: PathBuf,

    /// Root folder URL or ID under which everything is synced.
    #[arg(
        long = "root-folder",
        env = "GOOGLE_DRIVE_FOLDER_ID",
        default_value = DEFAULT_ROOT_FOLDER_ID,
        value_parser = parse_folder_id
    )]
    pub root_folder_id: String,

    /// Local directory uploaded by `backup`.
    #[arg(long, env = "BACKUP_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: PathBuf,

    /// Timeout applied to every Drive HTTP request, in seconds.
    #[arg(long, env = "DRIVE_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Guess content types from file extensions instead of sending text/plain.
    #[arg(long, env = "DRIVE_GUESS_CONTENT_TYPE")]
    pub guess_content_type: bool,

    #[arg(skip)]
    pub endpoints: Endpoints,
}

impl Settings {
    pub fn new(key_path: impl Into<PathBuf>, root_folder_id: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            root_folder_id: root_folder_id.into(),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            guess_content_type: false,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn content_type_policy(&self) -> ContentTypePolicy {
        if self.guess_content_type {
            ContentTypePolicy::Guess
        } else {
            ContentTypePolicy::default()
        }
    }
}
