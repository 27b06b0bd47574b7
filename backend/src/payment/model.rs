//! Payment models and commission split

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::round2;

/// Payment type
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Deposit,
    Remaining,
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Remaining => "remaining",
            PaymentType::Refund => "refund",
        }
    }
}

/// Payment status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Payment model
///
/// `commission_amount + provider_net_amount == amount` holds exactly; both
/// are fixed at creation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub commission_rate: Option<Decimal>,
    pub commission_amount: Decimal,
    pub provider_net_amount: Decimal,
    pub processor_reference: Option<String>,
    pub idempotency_key: String,
    pub status: PaymentStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Whether a replayed request describes this same movement
    pub fn same_movement(&self, booking_id: Uuid, payment_type: PaymentType, amount: Decimal) -> bool {
        self.booking_id == booking_id && self.payment_type == payment_type && self.amount == amount
    }
}

/// Request DTO for creating a payment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub commission_rate: Option<Decimal>,
    #[validate(length(min = 8, max = 128))]
    pub idempotency_key: String,
}

/// Processor outcome for a pending payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// Request DTO for recording a processor outcome
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentOutcomeRequest {
    pub outcome: PaymentOutcome,
    pub processor_reference: Option<String>,
}

/// Split an amount into (platform commission, mover net)
pub fn split_commission(amount: Decimal, rate: Decimal) -> (Decimal, Decimal) {
    let commission = round2(amount * rate);
    (commission, amount - commission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_split_is_exact() {
        let (commission, net) = split_commission(d("285.00"), d("0.10"));
        assert_eq!(commission, d("28.50"));
        assert_eq!(net, d("256.50"));
        assert_eq!(commission + net, d("285.00"));
    }

    #[test]
    fn test_split_rounds_commission_and_keeps_sum() {
        // 123.45 * 0.075 = 9.25875
        let (commission, net) = split_commission(d("123.45"), d("0.075"));
        assert_eq!(commission, d("9.26"));
        assert_eq!(net, d("114.19"));
        assert_eq!(commission + net, d("123.45"));
    }

    #[test]
    fn test_zero_rate() {
        let (commission, net) = split_commission(d("50.00"), Decimal::ZERO);
        assert_eq!(commission, Decimal::ZERO);
        assert_eq!(net, d("50.00"));
    }
}
