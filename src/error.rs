use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors raised while talking to Letterboxd
#[derive(thiserror::Error, Debug)]
pub enum LetterboxdError {
    #[error("Letterboxd returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Response for {0} did not include a Letterboxd identifier header")]
    MissingIdentifier(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pagination stopped after {max_pages} pages without reaching the end")]
    PageLimitExceeded { max_pages: usize },

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Invalid request URL {0}")]
    InvalidRequest(String),
}

impl LetterboxdError {
    /// Status code carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LetterboxdError::Status { status, .. } => Some(*status),
            LetterboxdError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type LetterboxdResult<T> = Result<T, LetterboxdError>;

/// Errors raised while loading the model file or the film catalog
#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed model: {0}")]
    Shape(String),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Letterboxd error: {0}")]
    Letterboxd(#[from] LetterboxdError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Letterboxd(ref e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Letterboxd(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Artifact(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
