//! Directory-to-folder sync and the dated memory backup.
//!
//! A sync run lists one local directory (files only, no recursion), resolves
//! the destination folder chain and uploads each file in turn. A file that
//! cannot be read or uploaded is recorded in [`SyncReport::failed`] and the run
//! moves on to the next one. A credential failure ends the run early, but the
//! report still carries every file uploaded before it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::{Settings, BACKUPS_FOLDER, DEFAULT_SOURCE_DIR};
use crate::error::{DriveError, Result};
use crate::models::RemoteFolder;
use crate::resolver::FolderResolver;
use crate::store::RemoteStore;
use crate::upload::{upload_file, ContentTypePolicy};

/// Source of "today" for dated backup folders.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Calendar date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// `YYYY-MM-DD`, the name of a dated backup folder.
pub fn dated_folder_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// One entry of a local directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub is_file: bool,
}

impl LocalEntry {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List the direct entries of `dir`, sorted by file name.
///
/// Symlinks are followed when deciding whether an entry is a regular file; a
/// dangling link counts as not-a-file.
pub async fn list_local_entries(dir: &Path) -> Result<Vec<LocalEntry>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| DriveError::local_io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| DriveError::local_io(dir, e))?
    {
        let path = entry.path();
        let is_file = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                false
            }
        };
        entries.push(LocalEntry { path, is_file });
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(entries)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedFile {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Destination folder; `None` when there was nothing to sync.
    pub folder: Option<RemoteFolder>,
    /// Destination path relative to the root, e.g. `Backups/2024-05-01`.
    pub remote_path: String,
    /// Uploaded files in local enumeration order.
    pub succeeded: Vec<SyncedFile>,
    pub failed: Vec<FailedFile>,
    /// Set when a credential failure stopped the run; files not attempted
    /// are listed in `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl SyncReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn uploaded_count(&self) -> usize {
        self.succeeded.len()
    }
}

/// Drives folder resolution and uploads for whole directories.
pub struct SyncOrchestrator {
    store: Arc<dyn RemoteStore>,
    resolver: FolderResolver,
    content_types: ContentTypePolicy,
    source_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn RemoteStore>, root_id: impl Into<String>) -> Self {
        Self {
            resolver: FolderResolver::new(store.clone(), root_id),
            store,
            content_types: ContentTypePolicy::default(),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_settings(store: Arc<dyn RemoteStore>, settings: &Settings) -> Self {
        Self::new(store, settings.root_folder_id.clone())
            .with_source_dir(settings.source_dir.clone())
            .with_content_types(settings.content_type_policy())
    }

    /// Replace the resolver, e.g. with a [`FolderResolver::serialized`] one.
    pub fn with_resolver(mut self, resolver: FolderResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_content_types(mut self, content_types: ContentTypePolicy) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn resolver(&self) -> &FolderResolver {
        &self.resolver
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Upload every regular file directly inside `local_path` into
    /// `root/<target_name>[/<date_subfolder>]`.
    ///
    /// The local directory is listed before anything remote happens, so an
    /// unreadable directory fails with `LocalIoError` and no remote calls.
    #[instrument(skip(self))]
    pub async fn sync_directory(
        &self,
        target_name: &str,
        local_path: &Path,
        date_subfolder: Option<&str>,
    ) -> Result<SyncReport> {
        let entries = list_local_entries(local_path).await?;

        let mut segments = vec![target_name];
        segments.extend(date_subfolder);
        let folder = self.resolver.resolve_path(&segments).await?;

        let report = self
            .upload_entries(folder, segments.join("/"), entries)
            .await?;
        info!(
            "Synced {} files to {} ({} failed)",
            report.uploaded_count(),
            report.remote_path,
            report.failed.len()
        );
        Ok(report)
    }

    /// Back up the source directory into `root/Backups/<today>`.
    ///
    /// A missing source directory means there is nothing to back up: the
    /// result is empty and no folder is resolved.
    #[instrument(skip(self), fields(source = %self.source_dir.display()))]
    pub async fn backup_memory_snapshot(&self) -> Result<SyncReport> {
        let exists = tokio::fs::try_exists(&self.source_dir)
            .await
            .map_err(|e| DriveError::local_io(&self.source_dir, e))?;
        if !exists {
            info!("No backup source at {}", self.source_dir.display());
            return Ok(SyncReport::empty());
        }

        let today = dated_folder_name(self.clock.today());
        let entries = list_local_entries(&self.source_dir).await?;
        let folder = self
            .resolver
            .resolve_path(&[BACKUPS_FOLDER, today.as_str()])
            .await?;

        let report = self
            .upload_entries(folder, format!("{}/{}", BACKUPS_FOLDER, today), entries)
            .await?;
        info!(
            "Backed up {} files to Drive/{}/",
            report.uploaded_count(),
            report.remote_path
        );
        Ok(report)
    }

    async fn upload_entries(
        &self,
        folder: RemoteFolder,
        remote_path: String,
        entries: Vec<LocalEntry>,
    ) -> Result<SyncReport> {
        let mut report = SyncReport {
            remote_path,
            ..SyncReport::default()
        };

        let mut files = entries.into_iter().filter(|e| e.is_file);
        while let Some(entry) = files.next() {
            let name = entry.name();
            match self.upload_entry(&entry, &name, &folder.id).await {
                Ok(id) => report.succeeded.push(SyncedFile { name, id }),
                Err(e) if e.is_credential() => {
                    // Every later upload would fail the same way.
                    error!("Credential failure uploading {}: {}", name, e);
                    let reason = e.to_string();
                    report.failed.push(FailedFile {
                        name,
                        reason: reason.clone(),
                    });
                    report.failed.extend(files.map(|skipped| FailedFile {
                        name: skipped.name(),
                        reason: format!("not attempted: {}", reason),
                    }));
                    report.aborted = Some(reason);
                    break;
                }
                Err(e) => {
                    warn!("Failed to upload {}: {}", entry.path.display(), e);
                    report.failed.push(FailedFile {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.folder = Some(folder);
        Ok(report)
    }

    async fn upload_entry(&self, entry: &LocalEntry, name: &str, folder_id: &str) -> Result<String> {
        let content = tokio::fs::read(&entry.path)
            .await
            .map_err(|e| DriveError::local_io(&entry.path, e))?;
        let content_type = self.content_types.content_type_for(&entry.path);
        let file = upload_file(self.store.as_ref(), name, content, &content_type, folder_id).await?;
        Ok(file.id)
    }
}
