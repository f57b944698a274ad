use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),
    /// Body that could not be read as JSON at all; keeps the status axum picked.
    #[error("{message}")]
    Body { status: StatusCode, message: String },
    #[error("Unauthenticated.")]
    Unauthenticated,
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "unreadable json body");
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::Body { status, message } => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server Error" })),
                )
                    .into_response()
            }
            other => {
                let status = match other {
                    ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::UNAUTHORIZED,
                };
                (status, Json(json!({ "message": other.to_string() }))).into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let mut errors = FieldErrors::new();
        errors.add("price", "The price field is required.");
        assert_eq!(
            ApiError::Validation(errors).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("Product not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Body {
                status: StatusCode::BAD_REQUEST,
                message: "Failed to parse the request body as JSON".into(),
            }
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("db down")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
