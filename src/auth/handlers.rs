use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair},
        jwt::{AuthUser, JwtKeys, TokenKind},
        password::{hash_password, verify_password},
    },
    error::ApiError,
    extract::ValidatedJson,
    state::AppState,
    users::{dto::UserResponse, repo},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/status", get(status))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = repo::create(&state.db, &payload.username, &payload.email, &hash).await?;
    info!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login with unknown email");
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let tokens = TokenPair {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
    };
    info!(user_id = user.id, "login succeeded");
    Ok(Json(tokens))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    // Token checks come before any lookup so a bad token never touches the pool.
    let claims = keys.verify_kind(&payload.refresh_token, TokenKind::Refresh)?;

    let user = repo::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = claims.sub, "refresh for vanished user");
            ApiError::TokenInvalid
        })?;

    let tokens = TokenPair {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
    };
    info!(user_id = user.id, "tokens refreshed");
    Ok(Json(tokens))
}

#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id, "token subject no longer exists");
            ApiError::TokenInvalid
        })?;

    Ok(Json(UserResponse::from(user)))
}
