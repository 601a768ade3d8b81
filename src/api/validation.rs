//! Input validation for API requests.
//!
//! Per-field validation functions returning `Result<(), String>`; handlers
//! collect failures with the `ValidationErrorBuilder` from the `error`
//! module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating user logins (lowercase alphanumeric, dashes and
    /// underscores inside, 2-32 chars)
    static ref LOGIN_REGEX: Regex = Regex::new(
        r"^[a-z0-9][a-z0-9_-]{0,30}[a-z0-9]$"
    ).unwrap();
}

/// Validate a display name (project, task, grant)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }

    Ok(())
}

/// Validate a description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.len() > 500 {
        return Err("Description is too long (max 500 characters)".to_string());
    }

    Ok(())
}

/// Validate a column label
pub fn validate_column_label(label: &str) -> Result<(), String> {
    if label.trim().is_empty() {
        return Err("Column label is required".to_string());
    }

    if label.len() > 50 {
        return Err("Column label is too long (max 50 characters)".to_string());
    }

    Ok(())
}

/// Validate a user login
pub fn validate_login(login: &str) -> Result<(), String> {
    if login.is_empty() {
        return Err("Login is required".to_string());
    }

    if !LOGIN_REGEX.is_match(login) {
        return Err(
            "Login must be 2-32 lowercase alphanumeric characters (dashes and underscores allowed inside)"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate an online/offline status flag
pub fn validate_online_status(status: &str) -> Result<(), String> {
    match status {
        "online" | "offline" => Ok(()),
        _ => Err("Status must be 'online' or 'offline'".to_string()),
    }
}

/// Validate an entity id (uuid format)
pub fn validate_uuid(id: &str, field: &str) -> Result<(), String> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| format!("{field} is not a valid id"))
}
