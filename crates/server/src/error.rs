use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use lockbox_extract::ExtractError;
use lockbox_recon::ReconcileError;
use lockbox_sheets::{ExportError, SheetsError};

/// Boundary error type: every failure maps to a human-readable message and a
/// status distinguishing client-caused from server-caused conditions.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed upload: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "rowsWritten", skip_serializing_if = "Option::is_none")]
    rows_written: Option<u32>,
}

fn extract_status(err: &ExtractError) -> StatusCode {
    match err {
        // Wrong file type is the client's doing; a crashed parser is ours.
        ExtractError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ExtractError::ExtractionFailed { .. } | ExtractError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, rows_written) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Extract(e) => (extract_status(e), None),
            ApiError::Reconcile(ReconcileError::Document { source, .. }) => {
                (extract_status(source), None)
            }
            ApiError::Export(ExportError::EmptyLedger) => (StatusCode::BAD_REQUEST, None),
            ApiError::Export(e @ ExportError::Cursor(_)) => {
                (StatusCode::BAD_GATEWAY, Some(e.rows_written()))
            }
            ApiError::Export(e @ ExportError::Partial { .. }) => {
                (StatusCode::BAD_GATEWAY, Some(e.rows_written()))
            }
            ApiError::Sheets(SheetsError::ConfigurationMissing(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            ApiError::Sheets(_) => (StatusCode::BAD_GATEWAY, None),
        };

        if status.is_server_error() {
            tracing::error!(%status, "request failed: {self}");
        } else {
            tracing::debug!(%status, "request rejected: {self}");
        }

        let body = ErrorBody { error: self.to_string(), rows_written };
        (status, Json(body)).into_response()
    }
}
