use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ValidationError;
use crate::store::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::EventNotFound(_) | StoreError::ParticipantNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Store(StoreError::EventFull { .. } | StoreError::DuplicateNickname(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Store(StoreError::Invalid(_)) | AppError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Store(StoreError::Io { .. } | StoreError::Serde(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:#}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(StoreError::EventNotFound(Uuid::nil())), StatusCode::NOT_FOUND),
            (AppError::from(StoreError::EventFull { max: 3 }), StatusCode::CONFLICT),
            (
                AppError::from(ValidationError::UnknownStatus("pending".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(StoreError::Invalid(ValidationError::InvalidCapacity)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
