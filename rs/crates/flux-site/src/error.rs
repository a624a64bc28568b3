use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use flux_render_html::escape_html;

use crate::stores::DataError;

/// Failure of a page handler. Component failures never reach here; the
/// runtime turns those into fragments.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Page not found."),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong."),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "page failed");
        }
        let body = format!(
            "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\" /><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{msg}</p></body></html>",
            code = status.as_u16(),
            msg = escape_html(msg),
        );
        (status, Html(body)).into_response()
    }
}

impl From<DataError> for AppError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::NotFound(what) => Self::NotFound(what),
            other => Self::Internal(other.to_string()),
        }
    }
}
