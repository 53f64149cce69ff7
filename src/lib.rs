//! drive_backup - Push local directories into a Google Drive folder tree.
//!
//! This library provides functionality to:
//! - Load service account credentials once and reuse the authenticated client
//! - Find or create folders by name under a parent folder
//! - Upload every file of a local directory into a resolved folder, recording
//!   per-file failures instead of aborting
//! - Back up a fixed source directory into `Backups/<YYYY-MM-DD>`
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use drive_backup::{CredentialProvider, Settings, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new("service-account.json", "root-folder-id");
//!     let provider = CredentialProvider::new(settings.clone());
//!     let client = provider.client().await?;
//!
//!     let orchestrator = SyncOrchestrator::from_settings(client, &settings);
//!     let report = orchestrator
//!         .sync_directory("kanban", Path::new("./exports"), None)
//!         .await?;
//!     println!("{} uploaded, {} failed", report.uploaded_count(), report.failed.len());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod server;
pub mod store;
pub mod sync;
pub mod upload;
pub mod url_parser;

// Re-exports for convenience
pub use auth::{Authenticator, CredentialProvider};
pub use client::DriveClient;
pub use config::Settings;
pub use error::{DriveError, Result};
pub use models::{RemoteEntry, RemoteFile, RemoteFolder};
pub use resolver::FolderResolver;
pub use store::RemoteStore;
pub use sync::{Clock, FixedClock, SyncOrchestrator, SyncReport, SystemClock};
pub use upload::{upload_file, ContentTypePolicy};
pub use url_parser::parse_folder_id;
