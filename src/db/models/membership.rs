//! Project membership: the many-to-many relation between users and projects.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub created_at: String,
}

/// Member row joined with user display data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberWithUser {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub avatar: Option<Vec<u8>>,
}

/// Member shape returned to clients, avatar base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub avatar: Option<String>,
}

impl From<MemberWithUser> for MemberResponse {
    fn from(member: MemberWithUser) -> Self {
        Self {
            user_id: member.user_id,
            name: member.name,
            role: member.role,
            status: member.status,
            avatar: super::user::encode_avatar(member.avatar.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub login: String,
}

impl Membership {
    /// Insert a (user, project) pair. A duplicate pair trips the UNIQUE
    /// constraint, which the API layer reports as a Conflict.
    pub async fn add(
        pool: &SqlitePool,
        user_id: &str,
        project_id: &str,
    ) -> Result<Membership, sqlx::Error> {
        let membership = Membership {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO memberships (id, user_id, project_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&membership.id)
        .bind(&membership.user_id)
        .bind(&membership.project_id)
        .bind(&membership.created_at)
        .execute(pool)
        .await?;

        Ok(membership)
    }

    /// Remove a (user, project) pair. Idempotent: removing an absent pair
    /// succeeds and reports zero rows.
    pub async fn remove(
        pool: &SqlitePool,
        user_id: &str,
        project_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE user_id = ? AND project_id = ?")
            .bind(user_id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Members of a project with their display data, optionally filtered
    /// to users currently flagged online.
    pub async fn list_members(
        pool: &SqlitePool,
        project_id: &str,
        online_only: bool,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        let base = r#"
            SELECT u.id as user_id, u.name, u.role, u.status, u.avatar
            FROM users u
            INNER JOIN memberships m ON u.id = m.user_id
            WHERE m.project_id = ?
        "#;

        let query = if online_only {
            format!("{base} AND u.status = 'online' ORDER BY u.name ASC")
        } else {
            format!("{base} ORDER BY u.name ASC")
        };

        sqlx::query_as::<_, MemberWithUser>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Ids of the projects a user belongs to.
    pub async fn project_ids_for_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT project_id FROM memberships WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
