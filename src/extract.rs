use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ApiError;

/// Works like `axum::Json<T>`, but collapses every body rejection (bad
/// syntax, wrong content type, missing or mistyped fields) into the fixed
/// validation error so axum's own rejection text never reaches a client.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                warn!(error = %rejection, "request body rejected");
                Err(ApiError::Validation)
            }
        }
    }
}

/// `axum::extract::Path` with its rejection collapsed the same way, so a
/// path parameter that fails to parse renders the same JSON body as a bad
/// request payload instead of axum's plain-text rejection.
pub struct ValidatedPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidatedPath(value)),
            Err(rejection) => {
                warn!(error = %rejection, "path parameter rejected");
                Err(ApiError::Validation)
            }
        }
    }
}
