//! Error types for the drive_backup crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while backing up to Google Drive.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Failed to read credentials file {path}: {source}")]
    CredentialsFileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Local I/O error on {path}: {source}")]
    LocalIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid folder URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DriveError {
    /// Credential failures are fatal for the process and must not be retried.
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            DriveError::CredentialsFileError { .. }
                | DriveError::CredentialsParseError(_)
                | DriveError::JwtError(_)
        )
    }

    /// Failures reported by, or on the way to, the remote API.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DriveError::HttpError(_)
                | DriveError::ApiError { .. }
                | DriveError::TokenRefreshError(_)
        )
    }

    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DriveError::LocalIoError {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
