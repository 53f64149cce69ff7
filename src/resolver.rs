//! Find-or-create folder resolution.
//!
//! Resolution is a read (query by parent + exact name) followed by a write
//! (create) when nothing matched. Two unserialized resolutions of the same
//! name under the same parent can both miss and both create, leaving duplicate
//! folders. [`FolderResolver::serialized`] closes that window within one
//! process; nothing here protects against other processes.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::models::RemoteFolder;
use crate::store::RemoteStore;

#[derive(Clone)]
pub struct FolderResolver {
    store: Arc<dyn RemoteStore>,
    root_id: String,
    lock: Option<Arc<Mutex<()>>>,
}

impl FolderResolver {
    /// Unserialized resolver, suitable for a single sequential caller.
    pub fn new(store: Arc<dyn RemoteStore>, root_id: impl Into<String>) -> Self {
        Self {
            store,
            root_id: root_id.into(),
            lock: None,
        }
    }

    /// Resolver whose read-then-write sections never overlap.
    pub fn serialized(store: Arc<dyn RemoteStore>, root_id: impl Into<String>) -> Self {
        Self {
            lock: Some(Arc::new(Mutex::new(()))),
            ..Self::new(store, root_id)
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Return the first folder named `name` under `parent_id`, creating it if
    /// none exists. Names compare exactly, case included.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_folder(&self, name: &str, parent_id: &str) -> Result<RemoteFolder> {
        let _guard = match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let mut matches = self.store.find_folders(name, parent_id).await?;
        if !matches.is_empty() {
            if matches.len() > 1 {
                debug!(
                    "{} folders named {:?} under {}, using the first",
                    matches.len(),
                    name,
                    parent_id
                );
            }
            return Ok(matches.swap_remove(0));
        }

        let folder = self.store.create_folder(name, parent_id).await?;
        info!("Created folder {:?} ({}) under {}", name, folder.id, parent_id);
        Ok(folder)
    }

    /// [`resolve_folder`](Self::resolve_folder) under the configured root.
    pub async fn resolve_in_root(&self, name: &str) -> Result<RemoteFolder> {
        let root_id = self.root_id.clone();
        self.resolve_folder(name, &root_id).await
    }

    /// Resolve each segment as a child of the previous one, starting at the
    /// root. An empty path yields the root itself.
    pub async fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<RemoteFolder> {
        let mut current = RemoteFolder::root(self.root_id.clone());
        for segment in segments {
            current = self.resolve_folder(segment.as_ref(), &current.id).await?;
        }
        Ok(current)
    }
}
