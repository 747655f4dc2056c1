use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::StatusResponse;

/// Request-level validation failures. The `Display` impl is the user-facing
/// message; presentation is handled uniformly by `AppError::into_response`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A product with '{name}' name already exists.")]
    DuplicateProductName { name: String },

    #[error("A variant with '{name}' name already exists for the product.")]
    DuplicateVariantName { name: String },

    #[error("active_time '{raw}' is not a valid timestamp")]
    InvalidActiveTime { raw: String },

    #[error("variant '{name}' {field} must be non-negative")]
    NegativeVariantField { name: String, field: &'static str },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database error");
                self.to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = StatusResponse::failed(message);
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
