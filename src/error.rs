use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::job::JobError;
use crate::output::RetrievalError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("YouTube URL is required.")]
    MissingUrl,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Invalid filename.")]
    InvalidFilename,

    #[error("File not found.")]
    NotFound,

    #[error(transparent)]
    Job(#[from] JobError),
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::InvalidFilename => ApiError::InvalidFilename,
            RetrievalError::NotFound => ApiError::NotFound,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Job(JobError::Spawn(_)) => {
                "Server error: Could not start download process.".to_string()
            }
            ApiError::Job(JobError::ToolFailed { .. }) => {
                "Failed to download or convert audio.".to_string()
            }
            ApiError::Job(JobError::OutputMissing { .. }) => {
                "Download succeeded but file not found on server.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Diagnostic detail; only tool failures carry it.
    fn detail(&self) -> Option<String> {
        match self {
            ApiError::Job(JobError::Spawn(e)) => Some(e.to_string()),
            ApiError::Job(JobError::ToolFailed { stderr, .. }) => Some(if stderr.is_empty() {
                "Unknown yt-dlp error".to_string()
            } else {
                stderr.clone()
            }),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl | ApiError::BadRequest(_) | ApiError::InvalidFilename => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            message: self.message(),
            error: self.detail(),
        })
    }
}
