//! User directory models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Operator,
    Mover,
    Client,
}

impl UserRole {
    /// Roles allowed to validate or reject quotes
    pub fn can_review_quotes(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Operator => "operator",
            UserRole::Mover => "mover",
            UserRole::Client => "client",
        }
    }
}

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    /// Set for mover staff accounts
    pub mover_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for registering a user
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(email)]
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub mover_id: Option<Uuid>,
}
