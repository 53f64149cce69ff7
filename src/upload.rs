//! Single-call file uploads.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::RemoteFile;
use crate::store::RemoteStore;

/// Content type sent when nothing better is configured.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// How the content type of an uploaded file is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypePolicy {
    /// Every file is sent with the same type.
    Fixed(String),
    /// Guess from the file extension, falling back to `application/octet-stream`.
    Guess,
}

impl Default for ContentTypePolicy {
    fn default() -> Self {
        ContentTypePolicy::Fixed(DEFAULT_CONTENT_TYPE.to_string())
    }
}

impl ContentTypePolicy {
    pub fn content_type_for(&self, path: &Path) -> String {
        match self {
            ContentTypePolicy::Fixed(content_type) => content_type.clone(),
            ContentTypePolicy::Guess => mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// Upload `content` as a new file `name` inside `folder_id`.
///
/// One create call, fully buffered, no retry. A failure is returned to the
/// caller untouched.
#[instrument(skip(store, content), fields(content_len = content.len()))]
pub async fn upload_file(
    store: &dyn RemoteStore,
    name: &str,
    content: Vec<u8>,
    content_type: &str,
    folder_id: &str,
) -> Result<RemoteFile> {
    let file = store
        .create_file(name, content, content_type, folder_id)
        .await?;
    debug!("Uploaded {} as {}", name, file.id);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy() {
        let policy = ContentTypePolicy::default();
        assert_eq!(policy.content_type_for(Path::new("photo.png")), "text/plain");
    }

    #[test]
    fn test_guess_policy() {
        let policy = ContentTypePolicy::Guess;
        assert_eq!(policy.content_type_for(Path::new("photo.png")), "image/png");
        assert_eq!(policy.content_type_for(Path::new("tasks.json")), "application/json");
        assert_eq!(
            policy.content_type_for(Path::new("blob")),
            "application/octet-stream"
        );
    }
}
