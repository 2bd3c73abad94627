use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::password::hash_password,
    error::ApiError,
    extract::{ValidatedJson, ValidatedPath},
    state::AppState,
};

use super::dto::{CreateUserRequest, MessageResponse, UpdateUserRequest, UserResponse};
use super::repo;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = repo::all(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::UserNotFound(id))?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already taken");
        return Err(ApiError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = repo::create(&state.db, &payload.username, &payload.email, &hash).await?;
    info!(user_id = user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("{} was added!", user.email),
        }),
    ))
}

/// The email check runs against every row, the row being updated included,
/// so resubmitting a user's current email is rejected as taken.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if repo::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::UserNotFound(id));
    }
    if repo::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already taken");
        return Err(ApiError::EmailTaken);
    }

    let password_hash = updated_password_hash(payload.password.as_deref())?;
    repo::update(
        &state.db,
        id,
        &payload.username,
        &payload.email,
        password_hash.as_deref(),
    )
    .await?;
    info!(user_id = id, password_changed = password_hash.is_some(), "user updated");

    Ok(Json(MessageResponse {
        message: format!("{id} was updated!"),
    }))
}

/// Hash for the password an update will store, when one was supplied.
/// `None` leaves the existing hash in place; the update query falls back to
/// the current column value.
fn updated_password_hash(password: Option<&str>) -> anyhow::Result<Option<String>> {
    match password {
        Some(plain) => Ok(Some(hash_password(plain)?)),
        None => Ok(None),
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::UserNotFound(id))?;

    repo::delete(&state.db, id).await?;
    info!(user_id = id, "user deleted");

    Ok(Json(MessageResponse {
        message: format!("{} was removed!", user.email),
    }))
}
