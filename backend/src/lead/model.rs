//! Lead models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Lead status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Converted,
}

/// How the volume estimate was obtained
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "estimation_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Declared,
    RoomCalculator,
    VideoCall,
    OnSiteVisit,
}

/// Lead model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub origin_address: String,
    pub origin_city: String,
    pub origin_postal_code: String,
    pub destination_address: String,
    pub destination_city: String,
    pub destination_postal_code: String,
    pub estimated_volume: Option<Decimal>, // cubic metres
    pub estimation_method: Option<EstimationMethod>,
    pub desired_date: Option<NaiveDate>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Request DTO for recording a lead
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub origin_address: String,
    #[validate(length(min = 1))]
    pub origin_city: String,
    #[validate(length(min = 1, max = 10))]
    pub origin_postal_code: String,
    #[validate(length(min = 1))]
    pub destination_address: String,
    #[validate(length(min = 1))]
    pub destination_city: String,
    #[validate(length(min = 1, max = 10))]
    pub destination_postal_code: String,
    pub estimated_volume: Option<Decimal>,
    pub estimation_method: Option<EstimationMethod>,
    pub desired_date: Option<NaiveDate>,
    pub source: Option<String>,
}

/// Query parameters for listing leads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
}
