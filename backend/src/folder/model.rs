//! Folder models and status transitions

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Folder status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "folder_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    Created,
    QuotesPending,
    Top3Ready,
    AwaitingPayment,
    Confirmed,
    Cancelled,
}

impl FolderStatus {
    pub const NON_TERMINAL: [FolderStatus; 4] = [
        FolderStatus::Created,
        FolderStatus::QuotesPending,
        FolderStatus::Top3Ready,
        FolderStatus::AwaitingPayment,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, FolderStatus::Confirmed | FolderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: FolderStatus) -> bool {
        use FolderStatus::*;
        match self {
            Created => matches!(next, QuotesPending | Top3Ready | AwaitingPayment | Cancelled),
            QuotesPending => {
                matches!(next, QuotesPending | Top3Ready | AwaitingPayment | Cancelled)
            }
            Top3Ready => matches!(next, Top3Ready | AwaitingPayment | Cancelled),
            AwaitingPayment => {
                matches!(next, AwaitingPayment | Top3Ready | Confirmed | Cancelled)
            }
            Confirmed | Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderStatus::Created => "created",
            FolderStatus::QuotesPending => "quotes_pending",
            FolderStatus::Top3Ready => "top3_ready",
            FolderStatus::AwaitingPayment => "awaiting_payment",
            FolderStatus::Confirmed => "confirmed",
            FolderStatus::Cancelled => "cancelled",
        }
    }
}

/// Folder model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Folder {
    pub id: Uuid,
    pub client_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub origin_address: String,
    pub origin_city: String,
    pub origin_postal_code: String,
    pub origin_floor: Option<i32>,
    pub origin_elevator: bool,
    pub destination_address: String,
    pub destination_city: String,
    pub destination_postal_code: String,
    pub destination_floor: Option<i32>,
    pub destination_elevator: bool,
    pub volume: Decimal, // cubic metres
    pub distance_km: Option<Decimal>,
    pub moving_date: NaiveDate,
    pub needs_packing: bool,
    pub needs_storage: bool,
    pub needs_insurance: bool,
    pub status: FolderStatus,
    pub selected_quote_id: Option<Uuid>,
    pub quotes_requested_at: Option<DateTime<Utc>>,
    pub top3_ready_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Folder {
    /// A fresh folder in `Created`
    pub fn new(request: CreateFolderRequest, lead_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Folder {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            lead_id,
            origin_address: request.origin_address,
            origin_city: request.origin_city,
            origin_postal_code: request.origin_postal_code,
            origin_floor: request.origin_floor,
            origin_elevator: request.origin_elevator,
            destination_address: request.destination_address,
            destination_city: request.destination_city,
            destination_postal_code: request.destination_postal_code,
            destination_floor: request.destination_floor,
            destination_elevator: request.destination_elevator,
            volume: request.volume,
            distance_km: request.distance_km,
            moving_date: request.moving_date,
            needs_packing: request.needs_packing,
            needs_storage: request.needs_storage,
            needs_insurance: request.needs_insurance,
            status: FolderStatus::Created,
            selected_quote_id: None,
            quotes_requested_at: None,
            top3_ready_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn has_open_status(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Move to `next`, returning the previous status
    pub fn transition(&mut self, next: FolderStatus, now: DateTime<Utc>) -> ApiResult<FolderStatus> {
        let previous = self.status;
        if !previous.can_transition_to(next) {
            return Err(ApiError::BadRequest(format!(
                "folder {} cannot move from {} to {}",
                self.id,
                previous.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(previous)
    }
}

/// Request DTO for opening a folder
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFolderRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1))]
    pub origin_address: String,
    #[validate(length(min = 1))]
    pub origin_city: String,
    #[validate(length(min = 1, max = 10))]
    pub origin_postal_code: String,
    pub origin_floor: Option<i32>,
    #[serde(default)]
    pub origin_elevator: bool,
    #[validate(length(min = 1))]
    pub destination_address: String,
    #[validate(length(min = 1))]
    pub destination_city: String,
    #[validate(length(min = 1, max = 10))]
    pub destination_postal_code: String,
    pub destination_floor: Option<i32>,
    #[serde(default)]
    pub destination_elevator: bool,
    pub volume: Decimal,
    pub distance_km: Option<Decimal>,
    pub moving_date: NaiveDate,
    #[serde(default)]
    pub needs_packing: bool,
    #[serde(default)]
    pub needs_storage: bool,
    #[serde(default)]
    pub needs_insurance: bool,
}

/// Mutable folder fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FolderPatch {
    pub origin_address: Option<String>,
    pub origin_city: Option<String>,
    pub origin_postal_code: Option<String>,
    pub origin_floor: Option<i32>,
    pub origin_elevator: Option<bool>,
    pub destination_address: Option<String>,
    pub destination_city: Option<String>,
    pub destination_postal_code: Option<String>,
    pub destination_floor: Option<i32>,
    pub destination_elevator: Option<bool>,
    pub volume: Option<Decimal>,
    pub distance_km: Option<Decimal>,
    pub moving_date: Option<NaiveDate>,
    pub needs_packing: Option<bool>,
    pub needs_storage: Option<bool>,
    pub needs_insurance: Option<bool>,
}

impl FolderPatch {
    /// Apply the set fields onto a folder
    pub fn apply_to(self, folder: &mut Folder) {
        if let Some(v) = self.origin_address {
            folder.origin_address = v;
        }
        if let Some(v) = self.origin_city {
            folder.origin_city = v;
        }
        if let Some(v) = self.origin_postal_code {
            folder.origin_postal_code = v;
        }
        if let Some(v) = self.origin_floor {
            folder.origin_floor = Some(v);
        }
        if let Some(v) = self.origin_elevator {
            folder.origin_elevator = v;
        }
        if let Some(v) = self.destination_address {
            folder.destination_address = v;
        }
        if let Some(v) = self.destination_city {
            folder.destination_city = v;
        }
        if let Some(v) = self.destination_postal_code {
            folder.destination_postal_code = v;
        }
        if let Some(v) = self.destination_floor {
            folder.destination_floor = Some(v);
        }
        if let Some(v) = self.destination_elevator {
            folder.destination_elevator = v;
        }
        if let Some(v) = self.volume {
            folder.volume = v;
        }
        if let Some(v) = self.distance_km {
            folder.distance_km = Some(v);
        }
        if let Some(v) = self.moving_date {
            folder.moving_date = v;
        }
        if let Some(v) = self.needs_packing {
            folder.needs_packing = v;
        }
        if let Some(v) = self.needs_storage {
            folder.needs_storage = v;
        }
        if let Some(v) = self.needs_insurance {
            folder.needs_insurance = v;
        }
    }
}

/// Request DTO for selecting a quote
#[derive(Debug, Clone, Deserialize)]
pub struct SelectQuoteRequest {
    pub quote_id: Uuid,
}

/// Query parameters for listing folders
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<FolderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        use FolderStatus::*;
        for next in [Created, QuotesPending, Top3Ready, AwaitingPayment, Confirmed, Cancelled] {
            assert!(!Confirmed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_cancel_reachable_from_every_non_terminal_state() {
        for status in FolderStatus::NON_TERMINAL {
            assert!(status.can_transition_to(FolderStatus::Cancelled), "{:?}", status);
        }
    }

    #[test]
    fn test_confirmation_only_from_awaiting_payment() {
        let sources: Vec<FolderStatus> = FolderStatus::NON_TERMINAL
            .into_iter()
            .filter(|s| s.can_transition_to(FolderStatus::Confirmed))
            .collect();
        assert_eq!(sources, vec![FolderStatus::AwaitingPayment]);
    }

    #[test]
    fn test_transition_reports_both_statuses() {
        let now = Utc::now();
        let mut folder = Folder::new(
            CreateFolderRequest {
                client_id: Uuid::new_v4(),
                origin_address: "12 rue Sainte-Catherine".to_string(),
                origin_city: "Bordeaux".to_string(),
                origin_postal_code: "33000".to_string(),
                origin_floor: None,
                origin_elevator: false,
                destination_address: "5 rue de Rivoli".to_string(),
                destination_city: "Paris".to_string(),
                destination_postal_code: "75001".to_string(),
                destination_floor: Some(3),
                destination_elevator: true,
                volume: Decimal::new(185, 1),
                distance_km: None,
                moving_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                needs_packing: false,
                needs_storage: false,
                needs_insurance: false,
            },
            None,
            now,
        );

        assert_eq!(
            folder.transition(FolderStatus::QuotesPending, now).unwrap(),
            FolderStatus::Created
        );
        let err = folder.transition(FolderStatus::Confirmed, now).unwrap_err();
        assert!(err.message().contains("quotes_pending"));
        assert!(err.message().contains("confirmed"));
        assert_eq!(folder.status, FolderStatus::QuotesPending);
    }

    #[test]
    fn test_no_way_back_to_created() {
        for status in FolderStatus::NON_TERMINAL {
            assert!(!status.can_transition_to(FolderStatus::Created), "{:?}", status);
        }
    }
}
