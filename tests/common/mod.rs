//! In-memory `RemoteStore` used by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use drive_backup::error::{DriveError, Result};
use drive_backup::models::FOLDER_MIME_TYPE;
use drive_backup::{RemoteEntry, RemoteFile, RemoteFolder, RemoteStore};

pub const ROOT: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindFolders { name: String, parent: String },
    CreateFolder { name: String, parent: String },
    CreateFile { name: String, folder: String, content_type: String },
    ListChildren { parent: String },
}

#[derive(Default)]
struct State {
    folders: Vec<RemoteFolder>,
    files: Vec<(RemoteFile, Vec<u8>)>,
    next_id: usize,
    calls: Vec<Call>,
    failing_uploads: HashSet<String>,
    credential_failure_at: Option<String>,
}

/// Drive-like store: folders may share a name, lookups return them in
/// creation order.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload of a file called `name` fail with a 500.
    pub fn fail_upload_of(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(name.to_string());
    }

    /// Make the upload of `name` fail as if the signing key were unusable.
    pub fn fail_credentials_at(&self, name: &str) {
        self.state.lock().unwrap().credential_failure_at = Some(name.to_string());
    }

    /// Pre-populate a folder, as if created by an earlier run.
    pub fn add_folder(&self, name: &str, parent: &str) -> RemoteFolder {
        let mut state = self.state.lock().unwrap();
        let folder = new_folder(&mut state, name, parent);
        state.folders.push(folder.clone());
        folder
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn created_folders(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateFolder { .. }))
            .count()
    }

    pub fn folders(&self) -> Vec<RemoteFolder> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn files(&self) -> Vec<RemoteFile> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .map(|(f, _)| f.clone())
            .collect()
    }

    pub fn content_of(&self, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|(f, _)| f.name == name)
            .map(|(_, c)| c.clone())
    }

    /// Slash-separated names from the root down to `folder_id`, e.g.
    /// `root/Backups/2024-05-01`.
    pub fn path_of(&self, folder_id: &str) -> String {
        let state = self.state.lock().unwrap();
        let mut segments = Vec::new();
        let mut current = folder_id.to_string();
        while current != ROOT {
            let folder = state
                .folders
                .iter()
                .find(|f| f.id == current)
                .unwrap_or_else(|| panic!("unknown folder {current}"));
            segments.push(folder.name.clone());
            current = folder.parent_id.clone().unwrap();
        }
        segments.push(ROOT.to_string());
        segments.reverse();
        segments.join("/")
    }
}

fn new_folder(state: &mut State, name: &str, parent: &str) -> RemoteFolder {
    state.next_id += 1;
    RemoteFolder {
        id: format!("folder-{}", state.next_id),
        name: name.to_string(),
        parent_id: Some(parent.to_string()),
        web_view_link: None,
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn find_folders(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFolder>> {
        let found: Vec<RemoteFolder> = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::FindFolders {
                name: name.to_string(),
                parent: parent_id.to_string(),
            });
            state
                .folders
                .iter()
                .filter(|f| f.name == name && f.parent_id.as_deref() == Some(parent_id))
                .cloned()
                .collect()
        };
        // A network round trip: other tasks may run between read and reply.
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteFolder> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateFolder {
            name: name.to_string(),
            parent: parent_id.to_string(),
        });
        let folder = new_folder(&mut state, name, parent_id);
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        folder_id: &str,
    ) -> Result<RemoteFile> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateFile {
            name: name.to_string(),
            folder: folder_id.to_string(),
            content_type: content_type.to_string(),
        });

        if state.credential_failure_at.as_deref() == Some(name) {
            return Err(DriveError::JwtError(
                jsonwebtoken::errors::ErrorKind::InvalidRsaKey("bad key".to_string()).into(),
            ));
        }

        if state.failing_uploads.contains(name) {
            return Err(DriveError::ApiError {
                status: 500,
                message: format!("backend error uploading {name}"),
            });
        }

        state.next_id += 1;
        let file = RemoteFile {
            id: format!("file-{}", state.next_id),
            name: name.to_string(),
            parent_id: folder_id.to_string(),
            mime_type: content_type.to_string(),
            created_time: Some(Utc::now()),
            web_view_link: None,
        };
        state.files.push((file.clone(), content));
        Ok(file)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteEntry>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListChildren {
            parent: parent_id.to_string(),
        });

        let folders = state
            .folders
            .iter()
            .filter(|f| f.parent_id.as_deref() == Some(parent_id))
            .map(|f| RemoteEntry {
                id: f.id.clone(),
                name: f.name.clone(),
                mime_type: Some(FOLDER_MIME_TYPE.to_string()),
                parents: vec![parent_id.to_string()],
                web_view_link: None,
                created_time: None,
                size: None,
            });
        let files = state
            .files
            .iter()
            .filter(|(f, _)| f.parent_id == parent_id)
            .map(|(f, content)| RemoteEntry {
                id: f.id.clone(),
                name: f.name.clone(),
                mime_type: Some(f.mime_type.clone()),
                parents: vec![parent_id.to_string()],
                web_view_link: None,
                created_time: f.created_time,
                size: Some(content.len() as u64),
            });
        Ok(folders.chain(files).collect())
    }
}
