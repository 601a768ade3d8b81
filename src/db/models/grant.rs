//! Grant models and DTOs. A grant is a named, numbered permission-like
//! record scoped to one project; it is not tied to a user.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grant {
    pub id: String,
    pub name: String,
    pub description: String,
    pub value: i64,
    pub project_id: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGrantRequest {
    pub name: String,
    pub description: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGrantRequest {
    pub name: String,
    pub description: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveGrantRequest {
    pub name: String,
}
