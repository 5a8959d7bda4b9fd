use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cohort_storage::StoreError;
use cohort_sync::IngestError;
use serde_json::json;
use tracing::error;

/// Handler error rendered as `{"error": message}` with its status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StoreError::InvalidInput(reason) => ApiError::bad_request(reason),
            StoreError::AlreadyExists(what) => ApiError::conflict(format!("{what} already exists")),
            other => {
                error!(error = %other, "storage failure");
                ApiError::internal("storage failure")
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MentorUnresolved { source, .. } => {
                ApiError::unprocessable(format!("mentor could not be resolved: {source}"))
            }
            IngestError::AlreadyIngested(srn) => {
                ApiError::conflict(format!("student {srn} already exists"))
            }
            IngestError::Store(source) => source.into(),
            other => {
                error!(error = %other, "ingestion failure");
                ApiError::internal("could not insert student")
            }
        }
    }
}
