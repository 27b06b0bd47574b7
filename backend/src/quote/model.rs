//! Quote models

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::services::scoring::SubScores;

/// Default currency for quotes
pub const DEFAULT_CURRENCY: &str = "EUR";

/// How the quote entered the system
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "quote_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Generated, // Priced by the platform from the mover's grid
    Parsed,    // Extracted from a mover's emailed document
    Manual,    // Typed in by an operator
}

/// Quote status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "quote_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Requested,
    Reminded,
    Validated,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub const ACTIVE: [QuoteStatus; 3] = [
        QuoteStatus::Requested,
        QuoteStatus::Reminded,
        QuoteStatus::Validated,
    ];

    pub const REMINDABLE: [QuoteStatus; 2] = [QuoteStatus::Requested, QuoteStatus::Reminded];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_remindable(&self) -> bool {
        Self::REMINDABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Requested => "requested",
            QuoteStatus::Reminded => "reminded",
            QuoteStatus::Validated => "validated",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }
}

/// Quote model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub mover_id: Uuid,
    pub source: QuoteSource,
    pub total_amount: Decimal,
    pub currency: String,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: QuoteStatus,
    pub reminder_count: i32,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub score_price: Option<Decimal>,
    pub score_reputation: Option<Decimal>,
    pub score_financial: Option<Decimal>,
    pub score_litigation: Option<Decimal>,
    pub score: Option<Decimal>,
    pub scored_at: Option<DateTime<Utc>>,
    pub validated_by: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Stored sub-scores, if the quote has been scored
    pub fn sub_scores(&self) -> Option<SubScores> {
        Some(SubScores {
            price: self.score_price?,
            reputation: self.score_reputation?,
            financial: self.score_financial?,
            litigation: self.score_litigation,
        })
    }
}

/// Listing convention: score descending (unscored last), then newest first
pub fn listing_order(a: &Quote, b: &Quote) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Request DTO for recording a quote
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    pub folder_id: Uuid,
    pub mover_id: Uuid,
    pub source: QuoteSource,
    pub total_amount: Decimal,
    pub currency: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Request DTO for validating or rejecting a quote
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateQuoteRequest {
    pub approved: bool,
    pub reason: Option<String>,
}

/// Request DTO for scoring a quote
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreQuoteRequest {
    pub score_price: Decimal,
    pub score_reputation: Decimal,
    pub score_financial: Decimal,
    pub score_litigation: Option<Decimal>,
}

impl From<ScoreQuoteRequest> for SubScores {
    fn from(request: ScoreQuoteRequest) -> Self {
        SubScores {
            price: request.score_price,
            reputation: request.score_reputation,
            financial: request.score_financial,
            litigation: request.score_litigation,
        }
    }
}

/// Query parameters for listing quotes
#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub folder_id: Option<Uuid>,
    pub mover_id: Option<Uuid>,
    pub statuses: Option<Vec<QuoteStatus>>,
}

impl QuoteFilter {
    pub fn for_folder(folder_id: Uuid) -> Self {
        Self {
            folder_id: Some(folder_id),
            ..Default::default()
        }
    }

    pub fn for_mover(mover_id: Uuid) -> Self {
        Self {
            mover_id: Some(mover_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[QuoteStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        self.folder_id.map_or(true, |id| quote.folder_id == id)
            && self.mover_id.map_or(true, |id| quote.mover_id == id)
            && self
                .statuses
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&quote.status))
    }
}
