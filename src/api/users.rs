//! User profile endpoints: profile read, avatar upload, online status,
//! and the membership relation viewed from the user side.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{Membership, Project, UpdateStatusRequest, User, UserResponse};
use crate::AppState;

use super::error::ApiError;
use super::validation::{validate_online_status, validate_uuid};

#[derive(Deserialize)]
pub struct AddUserProjectRequest {
    pub project_id: String,
}

async fn require_user(state: &AppState, id: &str) -> Result<User, ApiError> {
    if let Err(e) = validate_uuid(id, "user_id") {
        return Err(ApiError::validation_field("user_id", e));
    }

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Get a user's profile. The avatar comes back base64-encoded.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = require_user(&state, &id).await?;
    Ok(Json(user.into()))
}

/// Replace a user's avatar with the uploaded image bytes
pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    require_user(&state, &id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
        .ok_or_else(|| ApiError::bad_request("Missing image part"))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read image part: {e}")))?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("Image is empty"));
    }

    sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
        .bind(bytes.to_vec())
        .bind(&id)
        .execute(&state.db)
        .await?;

    let user = require_user(&state, &id).await?;
    Ok(Json(user.into()))
}

/// Flip a user's presence flag between online and offline
pub async fn update_online_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_user(&state, &id).await?;
    validate_online_status(&req.status)
        .map_err(|e| ApiError::validation_field("status", e))?;

    sqlx::query("UPDATE users SET status = ? WHERE id = ?")
        .bind(&req.status)
        .bind(&id)
        .execute(&state.db)
        .await?;

    let user = require_user(&state, &id).await?;
    Ok(Json(user.into()))
}

/// Ids of the projects the user belongs to
pub async fn list_user_projects(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    require_user(&state, &id).await?;
    let projects = Membership::project_ids_for_user(&state.db, &id).await?;
    Ok(Json(projects))
}

/// Join a project by id
pub async fn add_user_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddUserProjectRequest>,
) -> Result<StatusCode, ApiError> {
    require_user(&state, &id).await?;
    if let Err(e) = validate_uuid(&req.project_id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }

    Project::find(&state.db, &req.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Membership::add(&state.db, &id, &req.project_id)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                ApiError::conflict("User is already a member of this project")
            } else {
                tracing::error!("Failed to add membership: {}", e);
                ApiError::database("Failed to add membership")
            }
        })?;

    Ok(StatusCode::CREATED)
}

/// Leave a project. Idempotent: leaving a project the user is not a
/// member of still succeeds.
pub async fn remove_user_project(
    State(state): State<Arc<AppState>>,
    Path((id, project_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    require_user(&state, &id).await?;
    Membership::remove(&state.db, &id, &project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
