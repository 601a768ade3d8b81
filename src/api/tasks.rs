//! Task API endpoints: lifecycle, partial updates, file attachments.
//!
//! Each update endpoint is an independent partial update with
//! last-writer-wins semantics; there is no optimistic concurrency control.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    AssignTaskRequest, CreateTaskRequest, Project, TaskFile, TaskResponse, TaskWithAssignee,
    UpdateTaskInfoRequest, UpdateTaskPriorityRequest, UpdateTaskStatusRequest,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_description, validate_name, validate_uuid};

const TASK_WITH_ASSIGNEE_SQL: &str = r#"
    SELECT t.id, t.name, t.description, t.due_date, t.completed_at,
           t.assignee_id, t.project_id, t.status, t.priority, t.creator_id,
           u.avatar as assignee_avatar
    FROM tasks t
    LEFT JOIN users u ON t.assignee_id = u.id
    WHERE t.id = ?
"#;

fn validate_create_request(req: &CreateTaskRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Some(ref description) = req.description {
        if let Err(e) = validate_description(description) {
            errors.add("description", e);
        }
    }
    if req.due_date.trim().is_empty() {
        errors.add("due_date", "Due date is required");
    }
    if req.status.trim().is_empty() {
        errors.add("status", "Status is required");
    }
    if let Err(e) = validate_uuid(&req.project_id, "project_id") {
        errors.add("project_id", e);
    }
    if let Err(e) = validate_uuid(&req.creator_id, "creator_id") {
        errors.add("creator_id", e);
    }

    errors.finish()
}

async fn fetch_task(pool: &sqlx::SqlitePool, id: &str) -> Result<TaskWithAssignee, ApiError> {
    sqlx::query_as::<_, TaskWithAssignee>(TASK_WITH_ASSIGNEE_SQL)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// Create a task. Optional fields default to absent.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    validate_create_request(&req)?;

    Project::find(&state.db, &req.project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO tasks (id, name, description, due_date, completed_at, assignee_id,
                           project_id, status, priority, creator_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.due_date)
    .bind(&req.completed_at)
    .bind(&req.assignee_id)
    .bind(&req.project_id)
    .bind(&req.status)
    .bind(&req.priority)
    .bind(&req.creator_id)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let task = fetch_task(&state.db, &id).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Get a task with its file attachments
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    let task = fetch_task(&state.db, &id).await?;

    let files = sqlx::query_as::<_, TaskFile>(
        "SELECT * FROM files WHERE task_id = ? ORDER BY created_at ASC",
    )
    .bind(&id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(TaskResponse::from(task).with_files(files)))
}

/// Delete a task. File records go with it; the storage objects are an
/// accepted cleanup concern.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update<'q>(
    state: &AppState,
    id: &str,
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
) -> Result<Json<TaskResponse>, ApiError> {
    let result = query.execute(&state.db).await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    let task = fetch_task(&state.db, id).await?;
    Ok(Json(task.into()))
}

/// Move a task to another column
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskStatusRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }
    if req.status.trim().is_empty() {
        return Err(ApiError::validation_field("status", "Status is required"));
    }

    let query = sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
        .bind(req.status)
        .bind(&id);
    apply_update(&state, &id, query).await
}

/// Assign a task to a user, or clear the assignment
pub async fn assign_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AssignTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }
    if let Some(ref assignee_id) = req.assignee_id {
        if let Err(e) = validate_uuid(assignee_id, "assignee_id") {
            return Err(ApiError::validation_field("assignee_id", e));
        }
    }

    let query = sqlx::query("UPDATE tasks SET assignee_id = ? WHERE id = ?")
        .bind(req.assignee_id)
        .bind(&id);
    apply_update(&state, &id, query).await
}

/// Update a task's priority, or clear it
pub async fn update_priority(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskPriorityRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    let query = sqlx::query("UPDATE tasks SET priority = ? WHERE id = ?")
        .bind(req.priority)
        .bind(&id);
    apply_update(&state, &id, query).await
}

/// Update a task's name and description
pub async fn update_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskInfoRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }
    validate_name(&req.name).map_err(|e| ApiError::validation_field("name", e))?;
    if let Some(ref description) = req.description {
        validate_description(description)
            .map_err(|e| ApiError::validation_field("description", e))?;
    }

    let query = sqlx::query("UPDATE tasks SET name = ?, description = ? WHERE id = ?")
        .bind(req.name)
        .bind(req.description)
        .bind(&id);
    apply_update(&state, &id, query).await
}

/// Attach a file to a task: upload the multipart body to object storage
/// under a fresh key, then persist the file record. A failed upload means
/// no record is written.
pub async fn add_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TaskFile>), ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    fetch_task(&state.db, &id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
        .ok_or_else(|| ApiError::bad_request("Missing file part"))?;

    let file_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("File part has no filename"))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read file part: {e}")))?;

    // Fresh object key, original extension preserved for content sniffing
    let extension = std::path::Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let object_key = format!("{}{}", Uuid::new_v4(), extension);

    state
        .storage
        .upload(&object_key, bytes.to_vec())
        .await
        .map_err(|e| {
            tracing::error!("File upload failed: {:#}", e);
            ApiError::external_service("File upload to object storage failed")
        })?;

    let file = TaskFile {
        id: Uuid::new_v4().to_string(),
        task_id: id,
        name: file_name,
        object_key,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"
        INSERT INTO files (id, task_id, name, object_key, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&file.id)
    .bind(&file.task_id)
    .bind(&file.name)
    .bind(&file.object_key)
    .bind(&file.created_at)
    .execute(&state.db)
    .await?;

    tracing::info!(task_id = %file.task_id, key = %file.object_key, "File attached");

    Ok((StatusCode::CREATED, Json(file)))
}
