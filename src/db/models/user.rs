//! User models and DTOs.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: String,
    pub login: String,
    pub password_hash: String,
    pub avatar: Option<Vec<u8>>,
    pub status: String,
    pub created_at: String,
}

/// User shape returned to clients. The avatar leaves the system
/// base64-encoded; the password hash never leaves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub role: String,
    pub login: String,
    pub avatar: Option<String>,
    pub status: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            role: user.role,
            login: user.login,
            avatar: encode_avatar(user.avatar.as_deref()),
            status: user.status,
        }
    }
}

/// Base64-encode raw avatar bytes for transport.
pub fn encode_avatar(avatar: Option<&[u8]>) -> Option<String> {
    avatar.map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub role: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Login payload: the user plus the ids of the projects they belong to.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub projects: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}
