use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every externally visible failure of the API. The `Display` string of a
/// variant is exactly the `message` field clients receive.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Input payload validation failed")]
    Validation,

    #[error("User {0} does not exist")]
    UserNotFound(i64),

    #[error("Sorry. That email already exists.")]
    EmailTaken,

    #[error("User does not exist")]
    InvalidCredentials,

    #[error("Signature expired. Please log in again.")]
    TokenExpired,

    #[error("Invalid token. Please log in again.")]
    TokenInvalid,

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation | ApiError::EmailTaken => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound(_) | ApiError::InvalidCredentials => StatusCode::NOT_FOUND,
            ApiError::TokenExpired | ApiError::TokenInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref cause) = self {
            // The cause goes to the log, never to the client.
            error!(error = %cause, "request failed");
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::TokenInvalid,
        }
    }
}
