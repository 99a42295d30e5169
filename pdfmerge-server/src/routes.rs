//! HTTP routes.
//!
//! - `POST /merge-pdfs/` (and `/merge-pdfs`): merge uploaded PDFs
//! - `GET /health`: liveness probe

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use pdfmerge::config::{MergeForm, MergeOptions};
use pdfmerge::io::Upload;
use pdfmerge::pipeline::{MERGED_FILE_NAME, MergeRequest, MergeService};
use pdfmerge::MergeError;

/// Build the application router.
pub fn app(service: Arc<MergeService>) -> Router {
    let body_limit = service.config().limits.max_upload_bytes;

    Router::new()
        .route("/merge-pdfs/", post(merge_pdfs))
        .route("/merge-pdfs", post(merge_pdfs))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health() -> &'static str {
    "OK"
}

async fn merge_pdfs(
    State(service): State<Arc<MergeService>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut uploads = Vec::new();
    let mut form = MergeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "files" | "files[]" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await?;
                uploads.push(Upload::new(filename, content.to_vec()));
            }
            "compress" => form.compress = Some(field.text().await?),
            "quality" => form.quality = Some(field.text().await?),
            "password" => form.password = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let options = MergeOptions::from_form(&form)?;
    let merged = service.process(MergeRequest::new(uploads, options)).await?;

    let bytes = merged.read().await;
    merged.release();
    let bytes = bytes?;

    let disposition = format!("attachment; filename=\"{MERGED_FILE_NAME}\"");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The merge pipeline failed.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// The multipart body could not be read.
    #[error("{message}")]
    Multipart {
        /// Status reported by the multipart reader.
        status: StatusCode,
        /// Reader message.
        message: String,
    },
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Merge(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            Self::Merge(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Multipart { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = if status.is_server_error() {
            match &self {
                Self::Merge(err) => tracing::error!(
                    error = %err,
                    stage = ?err.stage(),
                    "Merge request failed"
                ),
                Self::Multipart { message, .. } => {
                    tracing::error!(error = %message, "Multipart read failed")
                }
            }
            format!("An error occurred: {self}")
        } else {
            tracing::debug!(%status, error = %self, "Rejected merge request");
            self.to_string()
        };

        let body = ErrorBody {
            error,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
