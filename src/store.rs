use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RemoteEntry, RemoteFile, RemoteFolder};

/// The remote operations the backup engine consumes.
///
/// [`DriveClient`](crate::DriveClient) implements this against Drive v3; any
/// object store with folder-like parents and query-by-parent can stand in.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Non-trashed folders named exactly `name` directly under `parent_id`,
    /// in the order the remote returns them.
    async fn find_folders(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFolder>>;

    /// Create a folder `name` under `parent_id`. Does not check for duplicates.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteFolder>;

    /// Create a file object with the given body under `folder_id`.
    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        folder_id: &str,
    ) -> Result<RemoteFile>;

    /// All non-trashed objects directly under `parent_id`.
    async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteEntry>>;
}
