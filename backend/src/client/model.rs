//! Client models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Name written over personal fields on anonymization
pub const ANONYMIZED_NAME: &str = "anonymized";

/// Client model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub anonymized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn is_anonymized(&self) -> bool {
        self.anonymized_at.is_some()
    }

    /// Scrub personal fields in place; the id and owned folders are kept
    pub fn scrub(&mut self, at: DateTime<Utc>) {
        self.first_name = ANONYMIZED_NAME.to_string();
        self.last_name = ANONYMIZED_NAME.to_string();
        self.email = format!("{}@anonymized.invalid", self.id.simple());
        self.phone = None;
        self.anonymized_at = Some(at);
        self.updated_at = at;
    }
}

/// Request DTO for creating a client
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}

/// Mutable client fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ClientPatch {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Query parameters for listing clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    /// Include anonymized clients (excluded by default)
    #[serde(default)]
    pub include_anonymized: bool,
}

/// Normalize an email for uniqueness comparisons
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
