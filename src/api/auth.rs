//! Registration and login. Login is a plain credential check: it returns
//! the user and the ids of the projects they belong to. There is no
//! session or token layer.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{LoginRequest, LoginResponse, Membership, RegisterRequest, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_login, validate_name};

/// Response for the login-availability probe
#[derive(Serialize)]
pub struct LoginAvailabilityResponse {
    pub available: bool,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_login(&req.login) {
        errors.add("login", e);
    }
    if req.password.len() < 8 {
        errors.add("password", "Password must be at least 8 characters");
    }
    if req.role.trim().is_empty() {
        errors.add("role", "Role is required");
    }

    errors.finish()
}

/// Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_register_request(&req)?;

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, role, login, password_hash, status, created_at)
        VALUES (?, ?, ?, ?, ?, 'offline', ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.role)
    .bind(&req.login)
    .bind(&password_hash)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to register user: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("A user with this login already exists")
        } else {
            ApiError::database("Failed to register user")
        }
    })?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(login = %user.login, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Login endpoint: credential check returning the user and their project ids
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE login = ?")
        .bind(&req.login)
        .fetch_optional(&state.db)
        .await?;

    // Same response for unknown login and wrong password
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid login or password"))?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid login or password"));
    }

    let projects = Membership::project_ids_for_user(&state.db, &user.id).await?;

    Ok(Json(LoginResponse {
        user: user.into(),
        projects,
    }))
}

/// Check whether a login is still available for registration
pub async fn check_login(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
) -> Result<Json<LoginAvailabilityResponse>, ApiError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE login = ?")
        .bind(&login)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(LoginAvailabilityResponse {
        available: count == 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
