//! Booking models and deposit arithmetic

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::round2;

/// Share of the total collected as deposit (0.30)
pub const DEPOSIT_RATIO: Decimal = Decimal::from_parts(30, 0, 0, false, 2);

/// Accepted distance between the submitted and the exact deposit (0.01)
pub const DEPOSIT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Booking status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    ContactsExchanged,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const OPEN: [BookingStatus; 3] = [
        BookingStatus::PendingPayment,
        BookingStatus::Confirmed,
        BookingStatus::ContactsExchanged,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::ContactsExchanged => "contacts_exchanged",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// Booking model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub quote_id: Uuid,
    pub mover_id: Uuid,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: BookingStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub contacts_exchanged_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Request DTO for creating a booking
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub folder_id: Uuid,
    pub quote_id: Uuid,
    pub total_amount: Decimal,
    pub deposit_amount: Decimal,
}

/// Query parameters for booking lookups
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub folder_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub mover_id: Option<Uuid>,
    pub open_only: bool,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.folder_id.map_or(true, |id| booking.folder_id == id)
            && self.quote_id.map_or(true, |id| booking.quote_id == id)
            && self.mover_id.map_or(true, |id| booking.mover_id == id)
            && (!self.open_only || booking.is_open())
    }
}

/// Exact 30% deposit for a total, rounded to the cent
pub fn expected_deposit(total: Decimal) -> Decimal {
    round2(total * DEPOSIT_RATIO)
}

/// Check the submitted deposit and return the remaining amount
pub fn settle_amounts(total: Decimal, deposit: Decimal) -> ApiResult<Decimal> {
    if total < Decimal::ZERO {
        return Err(ApiError::BadRequest(format!(
            "total_amount must not be negative, got {}",
            total
        )));
    }
    if (deposit - total * DEPOSIT_RATIO).abs() > DEPOSIT_TOLERANCE {
        return Err(ApiError::BadRequest(format!(
            "deposit_amount must be 30% of total_amount {}: expected {}, got {}",
            total,
            expected_deposit(total),
            deposit
        )));
    }
    Ok(total - deposit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_exact_deposit_accepted() {
        assert_eq!(settle_amounts(d("950.00"), d("285.00")).unwrap(), d("665.00"));
    }

    #[test]
    fn test_one_cent_either_side_accepted() {
        assert_eq!(settle_amounts(d("950.00"), d("285.01")).unwrap(), d("664.99"));
        assert_eq!(settle_amounts(d("950.00"), d("284.99")).unwrap(), d("665.01"));
    }

    #[test]
    fn test_beyond_tolerance_rejected_with_amounts() {
        let err = settle_amounts(d("950.00"), d("200.00")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(err.message().contains("expected 285.00"));
        assert!(err.message().contains("got 200.00"));

        assert!(settle_amounts(d("950.00"), d("285.02")).is_err());
    }

    #[test]
    fn test_fractional_cent_totals() {
        // 0.30 * 333.33 = 99.999
        assert_eq!(expected_deposit(d("333.33")), d("100.00"));
        assert_eq!(settle_amounts(d("333.33"), d("100.00")).unwrap(), d("233.33"));
    }

    #[test]
    fn test_negative_total_rejected() {
        assert!(settle_amounts(d("-10"), d("-3")).is_err());
    }

    #[test]
    fn test_open_statuses() {
        for status in BookingStatus::OPEN {
            assert!(!status.is_terminal());
        }
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }
}
