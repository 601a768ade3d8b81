//! Task attachment records. The bytes live in object storage; only the
//! object key is persisted here.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskFile {
    pub id: String,
    pub task_id: String,
    pub name: String,
    pub object_key: String,
    pub created_at: String,
}
