use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app::queue::InProcessQueue;
use crate::app::runner::ExportRunner;
use crate::error::BookMagicError;
use crate::locator;
use crate::pipeline::{Pipeline, Plan, Readiness};
use crate::preview::PreviewResult;
use crate::project::ProjectId;
use crate::store::{ExportRecord, ProjectStore, TemplateSelection, UploadRecord};
use crate::templates::TemplateDescriptor;
use crate::upload::{self, MAX_UPLOAD_BYTES, UploadReceipt};

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    store: Arc<dyn ProjectStore>,
    queue: InProcessQueue,
    runner: Arc<ExportRunner>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, store: Arc<dyn ProjectStore>, max_concurrency: usize) -> Self {
        let runner = Arc::new(ExportRunner::new(pipeline.clone(), Arc::clone(&store)));
        Self {
            pipeline,
            store,
            queue: InProcessQueue::new(max_concurrency),
            runner,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let exports = ServeDir::new(&state.pipeline.settings().layout.export_dir);

    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/templates", get(list_templates))
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(
                MAX_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES,
            )),
        )
        .route("/api/projects/:project_id/template", put(select_template))
        .route("/api/preview", get(preview_query).post(preview_body))
        .route("/api/export", post(start_export))
        .route("/api/export/:project_id", get(export_status))
        .route("/api/export/:project_id/download", get(download_zip))
        .nest_service("/exports", exports)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON error body: `{"success": false, "error": ..}` plus the input file
/// name when the failure happened after a source was found.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    input_file: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            input_file: None,
        }
    }
}

impl From<BookMagicError> for ApiError {
    fn from(err: BookMagicError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match BookMagicError::find(&err) {
            Some(typed) => Self::from(typed.clone()),
            None => {
                tracing::error!(?err, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            success: bool,
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            input_file: Option<String>,
        }

        let body = Body {
            success: false,
            error: self.message,
            input_file: self.input_file,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateDescriptor>> {
    Json(state.pipeline.registry().all().to_vec())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    message: &'static str,
    #[serde(flatten)]
    receipt: UploadReceipt,
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut project_raw: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(err.status(), err.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::new(err.status(), err.body_text()))?;
                file = Some((file_name, data));
            }
            Some("projectId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::new(err.status(), err.body_text()))?;
                project_raw = Some(text);
            }
            other => tracing::debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let (file_name, data) =
        file.ok_or(BookMagicError::MissingUploadField { field: "file" })?;
    let project_raw = project_raw
        .filter(|raw| !raw.trim().is_empty())
        .ok_or(BookMagicError::MissingUploadField { field: "projectId" })?;
    let project = ProjectId::parse(&project_raw)?;

    let receipt =
        upload::save_upload(&state.pipeline.settings().layout, &project, &file_name, &data).await?;
    state
        .store
        .record_upload(
            &project,
            UploadRecord {
                file_name: receipt.file_name.clone(),
                file_size: receipt.file_size,
                saved_path: receipt.saved_path.clone(),
                uploaded_at: Utc::now(),
            },
        )
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully",
        receipt,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectTemplateRequest {
    template_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectTemplateResponse {
    success: bool,
    project_id: ProjectId,
    #[serde(flatten)]
    selection: TemplateSelection,
}

async fn select_template(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<SelectTemplateRequest>,
) -> Result<Json<SelectTemplateResponse>, ApiError> {
    let project = ProjectId::parse(&project_id)?;
    let template_id = req.template_id.trim();
    if state.pipeline.registry().get(template_id).is_none() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("unknown template {template_id:?}"),
        ));
    }

    let selection = TemplateSelection {
        template_id: template_id.to_owned(),
        selected_at: Utc::now(),
    };
    state
        .store
        .select_template(&project, selection.clone())
        .await?;
    tracing::info!(project = %project, template_id, "template selected");

    Ok(Json(SelectTemplateResponse {
        success: true,
        project_id: project,
        selection,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    project_id: String,
    #[serde(default)]
    template_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreviewResponse {
    success: bool,
    #[serde(flatten)]
    preview: PreviewResult,
}

async fn preview_query(
    State(state): State<AppState>,
    Query(req): Query<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    run_preview(&state, req).await
}

async fn preview_body(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    run_preview(&state, req).await
}

async fn run_preview(
    state: &AppState,
    req: PreviewRequest,
) -> Result<Json<PreviewResponse>, ApiError> {
    let project = ProjectId::parse(&req.project_id)?;
    let template_id = match req.template_id.filter(|t| !t.trim().is_empty()) {
        Some(id) => Some(id),
        None => state
            .store
            .template(&project)
            .await?
            .map(|selection| selection.template_id),
    };

    match state.pipeline.preview(&project, template_id.as_deref()).await {
        Ok(preview) => Ok(Json(PreviewResponse {
            success: true,
            preview,
        })),
        Err(err) => {
            let mut api = ApiError::from(err);
            if api.status.is_server_error() {
                api.input_file =
                    locator::locate(&state.pipeline.settings().layout.uploads_dir, &project)
                        .map(|source| source.file_name());
            }
            Err(api)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    project_id: String,
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    plan: Plan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportAccepted {
    success: bool,
    project_id: ProjectId,
    template_id: String,
    plan: Plan,
    status_url: String,
}

async fn start_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<(StatusCode, Json<ExportAccepted>), ApiError> {
    let project = ProjectId::parse(&req.project_id)?;
    let template_id = match req.template_id.filter(|t| !t.trim().is_empty()) {
        Some(id) => id.trim().to_owned(),
        None => state
            .store
            .template(&project)
            .await?
            .map(|selection| selection.template_id)
            .ok_or_else(|| BookMagicError::NoTemplate {
                project_id: project.to_string(),
            })?,
    };

    state.runner.mark_queued(&project, &template_id).await?;
    tracing::info!(project = %project, template_id = %template_id, plan = ?req.plan, "export queued");

    let runner = Arc::clone(&state.runner);
    let job_project = project.clone();
    let job_template = template_id.clone();
    let plan = req.plan;
    state.queue.spawn(format!("export:{project}"), async move {
        runner.run_export(&job_project, &job_template, plan).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ExportAccepted {
            success: true,
            status_url: format!("/api/export/{project}"),
            project_id: project,
            template_id,
            plan,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportStatus {
    project_id: ProjectId,
    #[serde(flatten)]
    readiness: Readiness,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<ExportRecord>,
}

async fn export_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ExportStatus>, ApiError> {
    let project = ProjectId::parse(&project_id)?;
    let readiness = state.pipeline.readiness(&project);
    let export = state.store.export(&project).await?;

    Ok(Json(ExportStatus {
        project_id: project,
        ready: readiness.all(),
        readiness,
        export,
    }))
}

async fn download_zip(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Response, ApiError> {
    let project = ProjectId::parse(&project_id)?;
    let zip_path = state.pipeline.settings().layout.export_zip_path(&project);

    let file = match tokio::fs::File::open(&zip_path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                format!("no export package for project {project}"),
            ));
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("open: {}", zip_path.display()))
                .into());
        }
    };
    let body = axum::body::Body::from_stream(ReaderStream::new(file));

    let mut resp = Response::new(body);
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{project}-export.zip\""
    ))
    .map_err(|err| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    resp.headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    Ok(resp)
}
