//! HTTP trigger endpoints.
//!
//! - `POST /api/drive/backup` - run the dated memory backup
//! - `GET  /api/drive/backup` - list the objects under the root folder
//! - `POST /api/drive/sync`   - sync a local directory into a named folder
//! - `GET  /health`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::CredentialProvider;
use crate::error::DriveError;
use crate::models::RemoteEntry;
use crate::resolver::FolderResolver;
use crate::store::RemoteStore;
use crate::sync::{dated_folder_name, FailedFile, SyncOrchestrator, SyncReport, SyncedFile};

/// Store and orchestrator, built once credentials are available.
struct Engine {
    store: Arc<dyn RemoteStore>,
    orchestrator: SyncOrchestrator,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    provider: Option<Arc<CredentialProvider>>,
    engine: Arc<OnceCell<Engine>>,
}

impl AppState {
    /// Credentials are loaded on the first request that needs Drive.
    pub fn new(provider: Arc<CredentialProvider>) -> Self {
        Self {
            provider: Some(provider),
            engine: Arc::new(OnceCell::new()),
        }
    }

    /// Serve from an already-built store and orchestrator.
    pub fn with_store(store: Arc<dyn RemoteStore>, orchestrator: SyncOrchestrator) -> Self {
        Self {
            provider: None,
            engine: Arc::new(OnceCell::new_with(Some(Engine {
                store,
                orchestrator,
            }))),
        }
    }

    async fn engine(&self) -> Result<&Engine, DriveError> {
        self.engine
            .get_or_try_init(|| async {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    DriveError::InvalidRequest("no Drive store configured".to_string())
                })?;
                let client = provider.client().await?;
                let store: Arc<dyn RemoteStore> = client;
                let settings = provider.settings();

                // Requests run concurrently; folder creation must not race.
                let orchestrator = SyncOrchestrator::from_settings(store.clone(), settings)
                    .with_resolver(FolderResolver::serialized(
                        store.clone(),
                        settings.root_folder_id.clone(),
                    ));
                Ok::<_, DriveError>(Engine {
                    store,
                    orchestrator,
                })
            })
            .await
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiFailure {
    #[error("{0}")]
    BadRequest(String),

    #[error("{action} failed")]
    Operation {
        action: &'static str,
        #[source]
        source: DriveError,
    },
}

impl ApiFailure {
    fn operation(action: &'static str) -> impl FnOnce(DriveError) -> Self {
        move |source| ApiFailure::Operation { action, source }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiFailure::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiFailure::Operation { action, source } => {
                // Details stay in the log; clients get a generic message.
                error!("{} failed: {}", action, source);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        ApiFailure::BadRequest(rejection.body_text())
    }
}

/// Body of `POST /api/drive/sync`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncRequest {
    pub project_name: String,
    pub local_path: PathBuf,
    #[serde(default)]
    pub date_folder: Option<String>,
}

impl SyncRequest {
    pub fn validate(&self) -> Result<(), ApiFailure> {
        if self.project_name.trim().is_empty() || self.local_path.as_os_str().is_empty() {
            return Err(ApiFailure::BadRequest(
                "Missing projectName or localPath".to_string(),
            ));
        }
        if self.project_name.contains('/') {
            return Err(ApiFailure::BadRequest(
                "projectName must be a single folder name".to_string(),
            ));
        }
        if let Some(date) = &self.date_folder {
            let canonical = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map(dated_folder_name)
                .ok();
            if canonical.as_deref() != Some(date.as_str()) {
                return Err(ApiFailure::BadRequest(format!(
                    "dateFolder must be YYYY-MM-DD, got {:?}",
                    date
                )));
            }
        }
        Ok(())
    }
}

/// Summary returned by the trigger endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<SyncedFile>,
    pub failed: Vec<FailedFile>,
}

impl SyncResponse {
    fn from_report(verb: &str, report: SyncReport) -> Self {
        let mut message = format!("{} {} files", verb, report.uploaded_count());
        if !report.failed.is_empty() {
            message.push_str(&format!(", {} failed", report.failed.len()));
        }
        if report.is_aborted() {
            message.push_str(", stopped on a credential error");
        }
        Self {
            success: !report.is_aborted(),
            message,
            files: report.succeeded,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<RemoteEntry>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
}

/// POST /api/drive/backup
pub async fn backup_handler(
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, ApiFailure> {
    let engine = state.engine().await.map_err(ApiFailure::operation("Backup"))?;
    let report = engine
        .orchestrator
        .backup_memory_snapshot()
        .await
        .map_err(ApiFailure::operation("Backup"))?;
    Ok(Json(SyncResponse::from_report("Backed up", report)))
}

/// GET /api/drive/backup
pub async fn list_handler(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiFailure> {
    let engine = state.engine().await.map_err(ApiFailure::operation("List"))?;
    let root_id = engine.orchestrator.resolver().root_id();
    let files = engine
        .store
        .list_children(root_id)
        .await
        .map_err(ApiFailure::operation("List"))?;
    Ok(Json(ListResponse { files }))
}

/// POST /api/drive/sync
pub async fn sync_handler(
    State(state): State<AppState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, ApiFailure> {
    let Json(request) = payload?;
    request.validate()?;

    info!(
        "Sync requested: {} -> {}",
        request.local_path.display(),
        request.project_name
    );

    let engine = state.engine().await.map_err(ApiFailure::operation("Sync"))?;
    let report = engine
        .orchestrator
        .sync_directory(
            &request.project_name,
            &request.local_path,
            request.date_folder.as_deref(),
        )
        .await
        .map_err(ApiFailure::operation("Sync"))?;
    Ok(Json(SyncResponse::from_report("Synced", report)))
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/drive/backup", post(backup_handler).get(list_handler))
        .route("/api/drive/sync", post(sync_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
