//! HTTP surface: interview creation (JSON and resume upload), insights and
//! health.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use interviewer_core::create::{CreatedInterview, create_interview};
use interviewer_core::interview::now_iso;
use interviewer_core::resume::{ResumeError, extract_text};

use crate::state::AppState;

/// Errors surfaced to HTTP callers as `{"detail": ...}` with a matching
/// status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail.clone()),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub resume_text: String,
    pub job_description: String,
}

/// Direct creation entry point: resume text and job description in,
/// interview id and question list out.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateInterviewRequest>,
) -> Result<Json<CreatedInterview>, ApiError> {
    if request.resume_text.trim().is_empty() {
        return Err(ApiError::BadRequest("resume_text must not be empty".into()));
    }
    if request.job_description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "job_description must not be empty".into(),
        ));
    }

    let created = create_interview(
        &state.store,
        &state.questions,
        &request.resume_text,
        &request.job_description,
    )
    .await?;
    Ok(Json(created))
}

/// Multipart creation entry point: a PDF resume plus a job description form
/// field.
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreatedInterview>, ApiError> {
    let mut resume_bytes: Option<Bytes> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart request: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => {
                let filename = field.file_name().unwrap_or_default().to_lowercase();
                if !filename.ends_with(".pdf") {
                    return Err(ApiError::BadRequest(
                        "Only PDF files are supported".into(),
                    ));
                }
                resume_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?,
                );
            }
            Some("job_description") => {
                job_description = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read job description: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let resume_bytes =
        resume_bytes.ok_or_else(|| ApiError::BadRequest("Missing resume file".into()))?;
    let job_description =
        job_description.ok_or_else(|| ApiError::BadRequest("Missing job description".into()))?;
    if resume_bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty PDF file received".into()));
    }

    // PDF parsing is CPU-bound; keep it off the async workers.
    let resume_text = tokio::task::spawn_blocking(move || extract_text(&resume_bytes))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Extraction task failed: {e}")))?
        .map_err(|e: ResumeError| ApiError::BadRequest(e.to_string()))?;

    let created = create_interview(
        &state.store,
        &state.questions,
        &resume_text,
        &job_description,
    )
    .await?;
    Ok(Json(created))
}

/// Insights for a completed (or in-progress) interview.
pub async fn insights(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Response, ApiError> {
    let report = state.insights.compile(&interview_id).await?;
    match report {
        Some(report) => {
            tracing::info!("Retrieved insights for interview: {interview_id}");
            Ok(Json(report).into_response())
        }
        None => Err(ApiError::NotFound("Interview not found".into())),
    }
}

/// Liveness snapshot.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": now_iso(),
        "store": "memory",
        "oracle_model": state.chat_model,
    }))
}
