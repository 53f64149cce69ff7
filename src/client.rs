//! Google Drive API v3 client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use crate::auth::Authenticator;
use crate::config::Endpoints;
use crate::error::{DriveError, Result};
use crate::models::{
    ApiErrorResponse, FileListResponse, RemoteEntry, RemoteFile, RemoteFolder, ENTRY_FIELDS,
    FOLDER_MIME_TYPE,
};
use crate::store::RemoteStore;

/// Client for the Drive files API, authenticated as a service account.
#[derive(Debug, Clone)]
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    endpoints: Endpoints,
}

impl DriveClient {
    /// Create a client against the public Google endpoints.
    pub fn new(auth: Authenticator) -> Self {
        Self::with_http(auth, Client::new(), Endpoints::default())
    }

    pub fn with_http(auth: Authenticator, http: Client, endpoints: Endpoints) -> Self {
        Self {
            auth,
            http,
            endpoints,
        }
    }

    /// Query files using Google Drive query syntax, following every page.
    #[instrument(skip(self), level = "debug")]
    pub async fn query_files(&self, query: &str) -> Result<Vec<RemoteEntry>> {
        let token = self.auth.get_access_token().await?;
        let fields = format!("nextPageToken, files({})", ENTRY_FIELDS);
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.endpoints.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("q", query),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                    ("spaces", "drive"),
                    ("fields", fields.as_str()),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = check_status(request.send().await?).await?;
            let list_response: FileListResponse = response.json().await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Query matched {} objects", all_files.len());
        Ok(all_files)
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn find_folders(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFolder>> {
        let entries = self.query_files(&folder_query(name, parent_id)).await?;
        Ok(entries.into_iter().map(RemoteFolder::from).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<RemoteFolder> {
        let token = self.auth.get_access_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id]
        });

        let response = self
            .http
            .post(format!("{}/files", self.endpoints.api_base))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", ENTRY_FIELDS)])
            .json(&metadata)
            .send()
            .await?;

        let entry: RemoteEntry = check_status(response).await?.json().await?;
        let mut folder = RemoteFolder::from(entry);
        folder.parent_id.get_or_insert_with(|| parent_id.to_string());
        Ok(folder)
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        folder_id: &str,
    ) -> Result<RemoteFile> {
        let token = self.auth.get_access_token().await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id]
        });

        let metadata_part = Part::text(metadata.to_string()).mime_str("application/json")?;
        let file_part = Part::bytes(content)
            .file_name(name.to_string())
            .mime_str(content_type)?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.endpoints.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", ENTRY_FIELDS),
            ])
            .multipart(form)
            .send()
            .await?;

        let entry: RemoteEntry = check_status(response).await?.json().await?;

        Ok(RemoteFile {
            parent_id: entry
                .parents
                .into_iter()
                .next()
                .unwrap_or_else(|| folder_id.to_string()),
            mime_type: entry.mime_type.unwrap_or_else(|| content_type.to_string()),
            id: entry.id,
            name: entry.name,
            created_time: entry.created_time,
            web_view_link: entry.web_view_link,
        })
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteEntry>> {
        let query = format!("'{}' in parents and trashed = false", escape_query(parent_id));
        self.query_files(&query).await
    }
}

/// Drive query for non-trashed folders called exactly `name` under `parent_id`.
pub(crate) fn folder_query(name: &str, parent_id: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and mimeType = '{}' and trashed = false",
        escape_query(parent_id),
        escape_query(name),
        FOLDER_MIME_TYPE
    )
}

/// Escape a value for a single-quoted Drive query literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Map a non-success response to `ApiError`, preferring Google's error body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}
