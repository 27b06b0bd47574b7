//! Mover models

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Mover status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "mover_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MoverStatus {
    Pending,   // Onboarded, not yet vetted
    Active,    // Eligible for quote requests
    Suspended, // Manually suspended or blacklisted
}

/// Mover model
///
/// Coverage zones are department or postal prefixes; the Postgres adapter
/// stores them as `TEXT[]`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mover {
    pub id: Uuid,
    pub company_name: String,
    pub siret: String,
    pub email: String,
    pub phone: Option<String>,
    pub coverage_zones: BTreeSet<String>,
    pub rating: Option<Decimal>, // external review average, 0-5
    pub review_count: i32,
    pub financial_risk_score: Option<i32>, // external credit bureau score, 0-100
    pub litigation_count: i32,
    pub blacklisted: bool,
    pub blacklist_reason: Option<String>,
    pub status: MoverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Mover {
    pub fn covers(&self, zone: &str) -> bool {
        self.coverage_zones.iter().any(|z| zone.starts_with(z.as_str()))
    }
}

/// Request DTO for onboarding a mover
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMoverRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(length(equal = 14))]
    pub siret: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub coverage_zones: BTreeSet<String>,
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub review_count: i32,
    pub financial_risk_score: Option<i32>,
    #[serde(default)]
    pub litigation_count: i32,
}

/// Mutable mover fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MoverPatch {
    #[validate(length(min = 1, max = 200))]
    pub company_name: Option<String>,
    #[validate(length(equal = 14))]
    pub siret: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub coverage_zones: Option<BTreeSet<String>>,
    pub rating: Option<Decimal>,
    pub review_count: Option<i32>,
    pub financial_risk_score: Option<i32>,
    pub litigation_count: Option<i32>,
}

/// Request DTO for blacklisting a mover
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BlacklistRequest {
    pub reason: String,
}

/// Query parameters for listing movers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoverFilter {
    pub status: Option<MoverStatus>,
    /// Postal code or department the mover must cover
    pub zone: Option<String>,
}
