//! Project model and the board state operations.
//!
//! A project's board is an ordered list of column labels stored as a JSON
//! array in the `columns` TEXT field. Every operation that touches both the
//! column list and the tasks referencing it (rename, delete, project
//! cascade) runs in a single transaction so readers never observe a task
//! whose status matches no column, or a half-applied cascade.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Logins that do not resolve to a user are silently skipped when creating
/// a project with an initial member list. Kept as an explicit policy
/// constant so the behavior is visible and testable.
pub const SKIP_UNKNOWN_MEMBERS: bool = true;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// JSON array of column labels; use [`parse_columns`] to decode.
    pub columns: String,
    pub created_at: String,
}

/// Project shape returned to clients, with the column list decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub columns: Vec<String>,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            columns: parse_columns(&project.columns),
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub logins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameProjectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddColumnRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveColumnRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameColumnRequest {
    pub old_name: String,
    pub new_name: String,
}

/// Errors from board state operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{0}' already exists")]
    ColumnExists(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Decode the JSON column list from the database.
pub fn parse_columns(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Encode a column list for storage.
pub fn encode_columns(columns: &[String]) -> String {
    serde_json::to_string(columns).unwrap_or_else(|_| "[]".to_string())
}

async fn load_columns(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: &str,
) -> Result<Vec<String>, BoardError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT columns FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(&mut **tx)
        .await?;

    let (json,) = row.ok_or(BoardError::ProjectNotFound)?;
    Ok(parse_columns(&json))
}

async fn store_columns(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: &str,
    columns: &[String],
) -> Result<(), BoardError> {
    sqlx::query("UPDATE projects SET columns = ? WHERE id = ?")
        .bind(encode_columns(columns))
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

impl Project {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Create a project and enroll the given logins as members, in one
    /// transaction. Project names are unique; the UNIQUE constraint
    /// surfaces duplicates. Unknown logins are skipped per
    /// [`SKIP_UNKNOWN_MEMBERS`].
    pub async fn create_with_members(
        pool: &SqlitePool,
        name: &str,
        logins: &[String],
    ) -> Result<Project, sqlx::Error> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            columns: encode_columns(&[]),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, columns, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.columns)
        .bind(&project.created_at)
        .execute(&mut *tx)
        .await?;

        for login in logins {
            let user: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE login = ?")
                .bind(login)
                .fetch_optional(&mut *tx)
                .await?;

            let user_id = match user {
                Some((id,)) => id,
                None if SKIP_UNKNOWN_MEMBERS => {
                    tracing::warn!(login = %login, "Skipping unknown login on project creation");
                    continue;
                }
                None => return Err(sqlx::Error::RowNotFound),
            };

            sqlx::query(
                r#"
                INSERT INTO memberships (id, user_id, project_id, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&user_id)
            .bind(&project.id)
            .bind(&project.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(project)
    }

    /// Delete a project and everything scoped to it: tasks (their file
    /// records go with them), memberships, and grants, in one transaction.
    /// Returns false when no such project exists.
    pub async fn delete_cascade(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM memberships WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM grants WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Append a column label to the board. Duplicate labels are rejected:
    /// task status is matched by label, so two columns with the same label
    /// would make column membership ambiguous.
    pub async fn add_column(
        pool: &SqlitePool,
        project_id: &str,
        label: &str,
    ) -> Result<Vec<String>, BoardError> {
        let mut tx = pool.begin().await?;

        let mut columns = load_columns(&mut tx, project_id).await?;
        if columns.iter().any(|c| c == label) {
            return Err(BoardError::ColumnExists(label.to_string()));
        }
        columns.push(label.to_string());
        store_columns(&mut tx, project_id, &columns).await?;

        tx.commit().await?;
        Ok(columns)
    }

    /// Remove a column label and delete every task in the project sitting
    /// at that label. Removing a whole workflow stage removes its tasks;
    /// this is the destructive contract, not a relabel. Removing a label
    /// that is not on the board is an idempotent no-op.
    pub async fn remove_column(
        pool: &SqlitePool,
        project_id: &str,
        label: &str,
    ) -> Result<Vec<String>, BoardError> {
        let mut tx = pool.begin().await?;

        let mut columns = load_columns(&mut tx, project_id).await?;
        columns.retain(|c| c != label);
        store_columns(&mut tx, project_id, &columns).await?;

        sqlx::query("DELETE FROM tasks WHERE project_id = ? AND status = ?")
            .bind(project_id)
            .bind(label)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(columns)
    }

    /// Rename a column label and move every task at the old label to the
    /// new one. Both updates commit together; a concurrent reader sees
    /// either the old board or the new one, never a mix.
    pub async fn rename_column(
        pool: &SqlitePool,
        project_id: &str,
        old_label: &str,
        new_label: &str,
    ) -> Result<Vec<String>, BoardError> {
        let mut tx = pool.begin().await?;

        let mut columns = load_columns(&mut tx, project_id).await?;
        if columns.iter().any(|c| c == new_label) {
            return Err(BoardError::ColumnExists(new_label.to_string()));
        }
        let slot = columns
            .iter_mut()
            .find(|c| c.as_str() == old_label)
            .ok_or_else(|| BoardError::ColumnNotFound(old_label.to_string()))?;
        *slot = new_label.to_string();
        store_columns(&mut tx, project_id, &columns).await?;

        sqlx::query("UPDATE tasks SET status = ? WHERE project_id = ? AND status = ?")
            .bind(new_label)
            .bind(project_id)
            .bind(old_label)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_user(pool: &SqlitePool, login: &str) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, role, login, password_hash, status, created_at)
            VALUES (?, ?, 'member', ?, 'x', 'offline', ?)
            "#,
        )
        .bind(&id)
        .bind(login)
        .bind(login)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn seed_task(pool: &SqlitePool, project_id: &str, creator: &str, status: &str) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO tasks (id, name, due_date, project_id, status, creator_id, created_at)
            VALUES (?, 'task', '2024-06-01', ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(status)
        .bind(creator)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn task_count(pool: &SqlitePool, project_id: &str, status: Option<&str>) -> i64 {
        let (count,): (i64,) = match status {
            Some(status) => sqlx::query_as(
                "SELECT COUNT(*) FROM tasks WHERE project_id = ? AND status = ?",
            )
            .bind(project_id)
            .bind(status)
            .fetch_one(pool)
            .await
            .unwrap(),
            None => sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = ?")
                .bind(project_id)
                .fetch_one(pool)
                .await
                .unwrap(),
        };
        count
    }

    async fn columns_of(pool: &SqlitePool, project_id: &str) -> Vec<String> {
        let project = Project::find(pool, project_id).await.unwrap().unwrap();
        parse_columns(&project.columns)
    }

    #[test]
    fn test_columns_codec_roundtrip() {
        let labels = vec!["Todo".to_string(), "Doing".to_string()];
        assert_eq!(parse_columns(&encode_columns(&labels)), labels);
        assert!(parse_columns("not json").is_empty());
        assert!(parse_columns("[]").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_project_name_is_rejected() {
        let pool = test_pool().await;

        Project::create_with_members(&pool, "X", &[]).await.unwrap();
        let err = Project::create_with_members(&pool, "X", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("UNIQUE constraint failed"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE name = 'X'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_create_skips_unknown_logins() {
        let pool = test_pool().await;
        let known = seed_user(&pool, "ada").await;

        let project = Project::create_with_members(
            &pool,
            "Apollo",
            &["ada".to_string(), "nobody".to_string()],
        )
        .await
        .unwrap();

        let members: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM memberships WHERE project_id = ?")
                .bind(&project.id)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(members, vec![(known,)]);
    }

    #[tokio::test]
    async fn test_add_column_rejects_duplicate_label() {
        let pool = test_pool().await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();

        let columns = Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        assert_eq!(columns, vec!["Todo"]);

        let err = Project::add_column(&pool, &project.id, "Todo").await.unwrap_err();
        assert!(matches!(err, BoardError::ColumnExists(_)));
        assert_eq!(columns_of(&pool, &project.id).await, vec!["Todo"]);
    }

    #[tokio::test]
    async fn test_add_column_on_missing_project() {
        let pool = test_pool().await;
        let err = Project::add_column(&pool, "no-such-id", "Todo").await.unwrap_err();
        assert!(matches!(err, BoardError::ProjectNotFound));
    }

    #[tokio::test]
    async fn test_remove_column_deletes_its_tasks() {
        let pool = test_pool().await;
        let creator = seed_user(&pool, "ada").await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        Project::add_column(&pool, &project.id, "Done").await.unwrap();
        seed_task(&pool, &project.id, &creator, "Todo").await;
        seed_task(&pool, &project.id, &creator, "Todo").await;
        seed_task(&pool, &project.id, &creator, "Done").await;

        let columns = Project::remove_column(&pool, &project.id, "Todo").await.unwrap();

        assert_eq!(columns, vec!["Done"]);
        assert_eq!(task_count(&pool, &project.id, Some("Todo")).await, 0);
        assert_eq!(task_count(&pool, &project.id, Some("Done")).await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_column_is_noop() {
        let pool = test_pool().await;
        let creator = seed_user(&pool, "ada").await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        seed_task(&pool, &project.id, &creator, "Todo").await;

        let columns = Project::remove_column(&pool, &project.id, "Missing").await.unwrap();

        assert_eq!(columns, vec!["Todo"]);
        assert_eq!(task_count(&pool, &project.id, None).await, 1);
    }

    #[tokio::test]
    async fn test_rename_column_moves_tasks_count_preserving() {
        let pool = test_pool().await;
        let creator = seed_user(&pool, "ada").await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        Project::add_column(&pool, &project.id, "Done").await.unwrap();
        seed_task(&pool, &project.id, &creator, "Todo").await;
        seed_task(&pool, &project.id, &creator, "Todo").await;

        let total_before = task_count(&pool, &project.id, None).await;
        let columns = Project::rename_column(&pool, &project.id, "Todo", "Backlog")
            .await
            .unwrap();

        assert_eq!(columns, vec!["Backlog", "Done"]);
        assert_eq!(task_count(&pool, &project.id, Some("Todo")).await, 0);
        assert_eq!(task_count(&pool, &project.id, Some("Backlog")).await, 2);
        assert_eq!(task_count(&pool, &project.id, None).await, total_before);
    }

    #[tokio::test]
    async fn test_rename_column_errors() {
        let pool = test_pool().await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        Project::add_column(&pool, &project.id, "Done").await.unwrap();

        let err = Project::rename_column(&pool, &project.id, "Missing", "New")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ColumnNotFound(_)));

        let err = Project::rename_column(&pool, &project.id, "Todo", "Done")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ColumnExists(_)));

        // Board unchanged after both failed attempts
        assert_eq!(columns_of(&pool, &project.id).await, vec!["Todo", "Done"]);
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_tasks_and_memberships() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "ada").await;
        let project = Project::create_with_members(&pool, "Apollo", &["ada".to_string()])
            .await
            .unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        seed_task(&pool, &project.id, &user, "Todo").await;

        assert!(Project::delete_cascade(&pool, &project.id).await.unwrap());

        assert_eq!(task_count(&pool, &project.id, None).await, 0);
        let (memberships,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE project_id = ?")
                .bind(&project.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(memberships, 0);
        assert!(Project::find(&pool, &project.id).await.unwrap().is_none());

        // Second delete reports nothing to do
        assert!(!Project::delete_cascade(&pool, &project.id).await.unwrap());
    }

    /// Full board lifecycle: create with columns, rename a stage, then
    /// delete one. Mirrors the sprint-board workflow end to end.
    #[tokio::test]
    async fn test_sprint_board_scenario() {
        let pool = test_pool().await;
        let creator = seed_user(&pool, "ada").await;
        let project = Project::create_with_members(&pool, "Sprint1", &[]).await.unwrap();
        for label in ["Todo", "Doing", "Done"] {
            Project::add_column(&pool, &project.id, label).await.unwrap();
        }
        let task = seed_task(&pool, &project.id, &creator, "Todo").await;
        seed_task(&pool, &project.id, &creator, "Doing").await;

        Project::rename_column(&pool, &project.id, "Todo", "Backlog")
            .await
            .unwrap();

        let (status,): (String,) = sqlx::query_as("SELECT status FROM tasks WHERE id = ?")
            .bind(&task)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "Backlog");
        assert_eq!(
            columns_of(&pool, &project.id).await,
            vec!["Backlog", "Doing", "Done"]
        );

        Project::remove_column(&pool, &project.id, "Doing").await.unwrap();

        assert_eq!(task_count(&pool, &project.id, Some("Doing")).await, 0);
        assert_eq!(columns_of(&pool, &project.id).await, vec!["Backlog", "Done"]);
    }
}
