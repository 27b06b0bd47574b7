//! Shortlist snapshot models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Number of quotes presented in a shortlist
pub const SHORTLIST_SIZE: usize = 3;

/// One shortlisted quote, frozen at presentation time
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ShortlistEntry {
    pub quote_id: Uuid,
    pub score: Decimal,
    pub total_amount: Decimal,
}

/// Immutable snapshot of the best three validated quotes of a folder
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Top3Selection {
    pub id: Uuid,
    pub folder_id: Uuid,
    /// Ordered by descending score
    pub entries: [ShortlistEntry; SHORTLIST_SIZE],
    pub presented_at: DateTime<Utc>,
}

impl Top3Selection {
    pub fn quote_ids(&self) -> [Uuid; SHORTLIST_SIZE] {
        self.entries.map(|entry| entry.quote_id)
    }
}
