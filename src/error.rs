use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("User not found")]
    UserNotFound,

    #[error("Unsupported stamp ID: {0}")]
    UnsupportedStamp(String),

    #[error("Stamp {0} already granted")]
    StampAlreadyGranted(String),

    #[error("Survey already completed")]
    SurveyAlreadyCompleted,

    #[error("Survey not completed")]
    SurveyNotCompleted,

    #[error("Badge already claimed")]
    BadgeAlreadyClaimed,

    #[error("Insufficient points: {available} available, {required} required")]
    InsufficientPoints { available: i32, required: i32 },

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn missing(fields: &str) -> Self {
        AppError::BadRequest(format!("{fields} required"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Records the error under the handler's tag before it is turned into a response.
    pub fn log(&self, handler: &'static str) {
        if self.status().is_server_error() {
            error!(handler, error = %self, "request failed");
        } else {
            warn!(handler, error = %self, "request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::StampAlreadyGranted(_) => {
                json!({ "error": self.to_string(), "alreadyGranted": true })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
