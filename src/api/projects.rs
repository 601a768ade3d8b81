//! Project API endpoints: lifecycle, board columns, membership, grants.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AddColumnRequest, AddMemberRequest, BoardView, CreateGrantRequest, CreateProjectRequest,
    Grant, MemberResponse, Membership, Project, ProjectResponse, RemoveColumnRequest,
    RemoveGrantRequest, RenameColumnRequest, RenameProjectRequest, Task, UpdateGrantRequest,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_column_label, validate_description, validate_name, validate_uuid};

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Comma-separated project ids; omit to list everything
    pub ids: Option<String>,
}

/// Updated column list after a board mutation
#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
}

fn validate_create_request(req: &CreateProjectRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }

    errors.finish()
}

fn validate_grant_request(name: &str, description: &str) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_description(description) {
        errors.add("description", e);
    }

    errors.finish()
}

async fn require_project(pool: &sqlx::SqlitePool, id: &str) -> Result<Project, ApiError> {
    Project::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// List projects, optionally restricted to a set of ids
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = match query.ids {
        Some(ids) => {
            let mut projects = Vec::new();
            for id in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if let Err(e) = validate_uuid(id, "ids") {
                    return Err(ApiError::validation_field("ids", e));
                }
                projects.push(require_project(&state.db, id).await?);
            }
            projects
        }
        None => {
            sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// Create a new project with an optional initial member list
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    validate_create_request(&req)?;

    let project = Project::create_with_members(&state.db, &req.name, &req.logins)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create project: {}", e);
            if e.to_string().contains("UNIQUE constraint failed") {
                ApiError::conflict("A project with this name already exists")
            } else {
                ApiError::database("Failed to create project")
            }
        })?;

    tracing::info!(project = %project.name, "Project created");

    Ok((StatusCode::CREATED, Json(project.into())))
}

/// Rename a project
pub async fn rename_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    validate_name(&req.name).map_err(|e| ApiError::validation_field("name", e))?;

    let result = sqlx::query("UPDATE projects SET name = ? WHERE id = ?")
        .bind(&req.name)
        .bind(&id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("Failed to rename project: {}", e);
            if e.to_string().contains("UNIQUE constraint failed") {
                ApiError::conflict("A project with this name already exists")
            } else {
                ApiError::database("Failed to rename project")
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project not found"));
    }

    let project = require_project(&state.db, &id).await?;
    Ok(Json(project.into()))
}

/// Delete a project and everything scoped to it
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }

    if !Project::delete_cascade(&state.db, &id).await? {
        return Err(ApiError::not_found("Project not found"));
    }

    tracing::info!(project_id = %id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Get a project's board: columns plus tasks with assignee display data
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BoardView>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }

    let board = Task::board(&state.db, &id).await?;
    Ok(Json(board))
}

/// Append a column to the board
pub async fn add_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddColumnRequest>,
) -> Result<(StatusCode, Json<ColumnsResponse>), ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    validate_column_label(&req.name).map_err(|e| ApiError::validation_field("name", e))?;

    let columns = Project::add_column(&state.db, &id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(ColumnsResponse { columns })))
}

/// Remove a column and every task sitting at it
pub async fn remove_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RemoveColumnRequest>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }

    let columns = Project::remove_column(&state.db, &id, &req.name).await?;

    tracing::info!(project_id = %id, column = %req.name, "Column removed with its tasks");

    Ok(Json(ColumnsResponse { columns }))
}

/// Rename a column, moving its tasks to the new label
pub async fn rename_column(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameColumnRequest>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    validate_column_label(&req.new_name).map_err(|e| ApiError::validation_field("new_name", e))?;

    let columns = Project::rename_column(&state.db, &id, &req.old_name, &req.new_name).await?;
    Ok(Json(ColumnsResponse { columns }))
}

/// List project members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    require_project(&state.db, &id).await?;

    let members = Membership::list_members(&state.db, &id, false).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

/// List project members currently flagged online
pub async fn list_online_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    require_project(&state.db, &id).await?;

    let members = Membership::list_members(&state.db, &id, true).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

/// Add a member to a project by login
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    require_project(&state.db, &id).await?;

    let user: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE login = ?")
        .bind(&req.login)
        .fetch_optional(&state.db)
        .await?;
    let (user_id,) = user.ok_or_else(|| ApiError::not_found("User not found"))?;

    Membership::add(&state.db, &user_id, &id).await.map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("User is already a member of this project")
        } else {
            tracing::error!("Failed to add member: {}", e);
            ApiError::database("Failed to add member")
        }
    })?;

    let members = Membership::list_members(&state.db, &id, false).await?;
    let member = members
        .into_iter()
        .find(|m| m.user_id == user_id)
        .ok_or_else(|| ApiError::database("Failed to read back new member"))?;

    tracing::info!(project_id = %id, login = %req.login, "Member added");

    Ok((StatusCode::CREATED, Json(member.into())))
}

/// Remove a member from a project. Idempotent: removing an absent pair
/// succeeds.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    if let Err(e) = validate_uuid(&user_id, "user_id") {
        return Err(ApiError::validation_field("user_id", e));
    }

    Membership::remove(&state.db, &user_id, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List a project's grants
pub async fn list_grants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Grant>>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    require_project(&state.db, &id).await?;

    let grants = sqlx::query_as::<_, Grant>(
        "SELECT * FROM grants WHERE project_id = ? ORDER BY created_at ASC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(grants))
}

/// Add a grant to a project. Grant names are not unique within a project.
pub async fn add_grant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateGrantRequest>,
) -> Result<(StatusCode, Json<Grant>), ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    validate_grant_request(&req.name, &req.description)?;
    require_project(&state.db, &id).await?;

    let grant = Grant {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        value: req.value,
        project_id: id,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"
        INSERT INTO grants (id, name, description, value, project_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&grant.id)
    .bind(&grant.name)
    .bind(&grant.description)
    .bind(grant.value)
    .bind(&grant.project_id)
    .bind(&grant.created_at)
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Edit a grant. The statement filters by project id as well as grant id
/// so a grant can never be edited through another project's route.
pub async fn edit_grant(
    State(state): State<Arc<AppState>>,
    Path((id, grant_id)): Path<(String, String)>,
    Json(req): Json<UpdateGrantRequest>,
) -> Result<Json<Grant>, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }
    if let Err(e) = validate_uuid(&grant_id, "grant_id") {
        return Err(ApiError::validation_field("grant_id", e));
    }
    validate_grant_request(&req.name, &req.description)?;

    let result = sqlx::query(
        r#"
        UPDATE grants SET name = ?, description = ?, value = ?
        WHERE id = ? AND project_id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.value)
    .bind(&grant_id)
    .bind(&id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Grant not found"));
    }

    let grant = sqlx::query_as::<_, Grant>("SELECT * FROM grants WHERE id = ?")
        .bind(&grant_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(grant))
}

/// Remove every grant with the given name in a project. Grants are keyed
/// by name for removal, so the name travels in the body like a column
/// removal. Scoped to the project; idempotent when nothing matches.
pub async fn remove_grant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RemoveGrantRequest>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "project_id") {
        return Err(ApiError::validation_field("project_id", e));
    }

    sqlx::query("DELETE FROM grants WHERE name = ? AND project_id = ?")
        .bind(&req.name)
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
