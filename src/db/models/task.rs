//! Task models and DTOs.
//!
//! Transport convention: optional task fields (description, completion
//! date, assignee, priority) travel as empty strings when absent. Clients
//! of the original API expect that shape, so the Option -> empty-string
//! conversion happens here, in `TaskResponse`, and nowhere else.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::file::TaskFile;
use super::project::{parse_columns, BoardError};
use super::user::encode_avatar;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub due_date: String,
    pub completed_at: Option<String>,
    pub assignee_id: Option<String>,
    pub project_id: String,
    pub status: String,
    pub priority: Option<String>,
    pub creator_id: String,
    pub created_at: String,
}

/// Task row joined with the assignee's avatar for board display.
#[derive(Debug, Clone, FromRow)]
pub struct TaskWithAssignee {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub due_date: String,
    pub completed_at: Option<String>,
    pub assignee_id: Option<String>,
    pub project_id: String,
    pub status: String,
    pub priority: Option<String>,
    pub creator_id: String,
    pub assignee_avatar: Option<Vec<u8>>,
}

/// Task shape returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub due_date: String,
    pub completed_at: String,
    pub assignee_id: String,
    pub assignee_avatar: Option<String>,
    pub project_id: String,
    pub status: String,
    pub priority: String,
    pub creator_id: String,
    #[serde(default)]
    pub files: Vec<TaskFile>,
}

fn to_transport(value: Option<String>) -> String {
    value.unwrap_or_default()
}

impl From<TaskWithAssignee> for TaskResponse {
    fn from(task: TaskWithAssignee) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: to_transport(task.description),
            due_date: task.due_date,
            completed_at: to_transport(task.completed_at),
            assignee_id: to_transport(task.assignee_id),
            assignee_avatar: encode_avatar(task.assignee_avatar.as_deref()),
            project_id: task.project_id,
            status: task.status,
            priority: to_transport(task.priority),
            creator_id: task.creator_id,
            files: Vec::new(),
        }
    }
}

impl TaskResponse {
    pub fn with_files(mut self, files: Vec<TaskFile>) -> Self {
        self.files = files;
        self
    }
}

/// One consistent read of a project's board: the ordered column list
/// plus every task with its assignee display data.
#[derive(Debug, Serialize)]
pub struct BoardView {
    pub columns: Vec<String>,
    pub tasks: Vec<TaskResponse>,
}

impl Task {
    /// Fetch the board for a project. Runs inside a transaction so the
    /// column list and the task list come from the same snapshot.
    pub async fn board(pool: &sqlx::SqlitePool, project_id: &str) -> Result<BoardView, BoardError> {
        let mut tx = pool.begin().await?;

        let columns_json: Option<(String,)> =
            sqlx::query_as("SELECT columns FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (columns_json,) = columns_json.ok_or(BoardError::ProjectNotFound)?;

        let tasks = sqlx::query_as::<_, TaskWithAssignee>(
            r#"
            SELECT t.id, t.name, t.description, t.due_date, t.completed_at,
                   t.assignee_id, t.project_id, t.status, t.priority, t.creator_id,
                   u.avatar as assignee_avatar
            FROM tasks t
            LEFT JOIN users u ON t.assignee_id = u.id
            WHERE t.project_id = ?
            ORDER BY t.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BoardView {
            columns: parse_columns(&columns_json),
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: Option<String>,
    pub due_date: String,
    pub completed_at: Option<String>,
    pub assignee_id: Option<String>,
    pub project_id: String,
    pub status: String,
    pub priority: Option<String>,
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: String,
}

/// `assignee_id: null` clears the assignment.
#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    pub assignee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskPriorityRequest {
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskInfoRequest {
    pub name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::project::Project;
    use crate::db::test_pool;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    async fn seed_user(pool: &SqlitePool, login: &str, avatar: Option<Vec<u8>>) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, role, login, password_hash, avatar, status, created_at)
            VALUES (?, ?, 'member', ?, 'x', ?, 'offline', ?)
            "#,
        )
        .bind(&id)
        .bind(login)
        .bind(login)
        .bind(avatar)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[allow(clippy::too_many_arguments)]
    async fn seed_task(
        pool: &SqlitePool,
        project_id: &str,
        creator: &str,
        status: &str,
        assignee: Option<&str>,
        description: Option<&str>,
        created_at: &str,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO tasks (id, name, description, due_date, assignee_id,
                               project_id, status, creator_id, created_at)
            VALUES (?, 'task', ?, '2024-06-01', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(description)
        .bind(assignee)
        .bind(project_id)
        .bind(status)
        .bind(creator)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_board_reads_columns_and_tasks_in_one_view() {
        let pool = test_pool().await;
        let creator = seed_user(&pool, "bob", None).await;
        let ada = seed_user(&pool, "ada", Some(vec![1, 2, 3])).await;
        let project = Project::create_with_members(&pool, "Apollo", &[]).await.unwrap();
        Project::add_column(&pool, &project.id, "Todo").await.unwrap();
        Project::add_column(&pool, &project.id, "Done").await.unwrap();

        let assigned = seed_task(
            &pool,
            &project.id,
            &creator,
            "Todo",
            Some(&ada),
            Some("details"),
            "2024-06-01T00:00:00Z",
        )
        .await;
        let bare = seed_task(
            &pool,
            &project.id,
            &creator,
            "Done",
            None,
            None,
            "2024-06-02T00:00:00Z",
        )
        .await;

        let board = Task::board(&pool, &project.id).await.unwrap();

        assert_eq!(board.columns, vec!["Todo", "Done"]);
        assert_eq!(board.tasks.len(), 2);

        // Oldest first
        assert_eq!(board.tasks[0].id, assigned);
        assert_eq!(board.tasks[0].assignee_id, ada);
        assert_eq!(board.tasks[0].assignee_avatar.as_deref(), Some("AQID"));
        assert_eq!(board.tasks[0].description, "details");

        assert_eq!(board.tasks[1].id, bare);
        assert_eq!(board.tasks[1].assignee_id, "");
        assert!(board.tasks[1].assignee_avatar.is_none());
        assert_eq!(board.tasks[1].description, "");
        assert_eq!(board.tasks[1].priority, "");
    }

    #[tokio::test]
    async fn test_board_on_missing_project() {
        let pool = test_pool().await;
        let err = Task::board(&pool, "no-such-id").await.unwrap_err();
        assert!(matches!(err, BoardError::ProjectNotFound));
    }

    fn sample_row() -> TaskWithAssignee {
        TaskWithAssignee {
            id: "t1".to_string(),
            name: "Fix login".to_string(),
            description: None,
            due_date: "2024-06-01".to_string(),
            completed_at: None,
            assignee_id: Some("u2".to_string()),
            project_id: "p1".to_string(),
            status: "Todo".to_string(),
            priority: Some("high".to_string()),
            creator_id: "u1".to_string(),
            assignee_avatar: None,
        }
    }

    #[test]
    fn test_absent_fields_materialize_as_empty_strings() {
        let response: TaskResponse = sample_row().into();
        assert_eq!(response.description, "");
        assert_eq!(response.completed_at, "");
        assert_eq!(response.assignee_id, "u2");
        assert_eq!(response.priority, "high");
        assert!(response.assignee_avatar.is_none());
        assert!(response.files.is_empty());
    }

    #[test]
    fn test_present_fields_pass_through() {
        let mut row = sample_row();
        row.description = Some("details".to_string());
        row.completed_at = Some("2024-06-02".to_string());

        let response: TaskResponse = row.into();
        assert_eq!(response.description, "details");
        assert_eq!(response.completed_at, "2024-06-02");
    }
}
