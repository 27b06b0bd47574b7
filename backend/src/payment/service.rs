use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::booking::{confirmation_unit, Booking, BookingStatus};
use crate::config::CommissionBounds;
use crate::error::{ApiError, ApiResult};
use crate::models::ensure_cents;
use crate::payment::model::{
    split_commission, CreatePaymentRequest, Payment, PaymentOutcome, PaymentOutcomeRequest,
    PaymentStatus, PaymentType,
};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// Sum of succeeded payments of one type
fn settled(payments: &[Payment], payment_type: PaymentType) -> Decimal {
    payments
        .iter()
        .filter(|p| p.payment_type == payment_type && p.status == PaymentStatus::Succeeded)
        .map(|p| p.amount)
        .sum()
}

/// Collected amounts minus every refund not known to have failed
///
/// Pending refunds are reserved so two refunds cannot both spend the same
/// balance. `excluding` leaves one refund out of the reservation.
fn refundable(payments: &[Payment], excluding: Option<Uuid>) -> Decimal {
    let collected = settled(payments, PaymentType::Deposit) + settled(payments, PaymentType::Remaining);
    let reserved: Decimal = payments
        .iter()
        .filter(|p| {
            p.payment_type == PaymentType::Refund
                && p.status != PaymentStatus::Failed
                && Some(p.id) != excluding
        })
        .map(|p| p.amount)
        .sum();
    collected - reserved
}

/// Service for payments and the commission split
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MoveStore>,
    bounds: CommissionBounds,
}

impl PaymentService {
    pub fn new(store: Arc<dyn MoveStore>, bounds: CommissionBounds) -> Self {
        Self { store, bounds }
    }

    /// Register a pending payment against a booking
    ///
    /// Replaying an idempotency key with the same booking, type and amount
    /// returns the payment created the first time.
    pub async fn create(&self, booking_id: Uuid, request: CreatePaymentRequest) -> ApiResult<Payment> {
        request.validate()?;

        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("booking {} not found", booking_id)))?;

        if let Some(existing) = self.replay(&booking, &request).await? {
            return Ok(existing);
        }

        if request.amount <= Decimal::ZERO {
            return Err(ApiError::BadRequest(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        ensure_cents("amount", request.amount)?;

        let payments = self.store.list_payments(booking_id).await?;
        let (commission_rate, commission_amount, provider_net_amount) = match request.payment_type {
            PaymentType::Deposit => {
                let rate = self.deposit_rate(&request)?;
                self.check_deposit(&booking, &payments, request.amount)?;
                let (commission, net) = split_commission(request.amount, rate);
                (Some(rate), commission, net)
            }
            PaymentType::Remaining => {
                check_remaining(&booking, &payments, request.amount)?;
                (None, Decimal::ZERO, request.amount)
            }
            PaymentType::Refund => {
                check_refund(&booking, &payments, request.amount)?;
                (None, Decimal::ZERO, request.amount)
            }
        };

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id,
            payment_type: request.payment_type,
            amount: request.amount,
            commission_rate,
            commission_amount,
            provider_net_amount,
            processor_reference: None,
            idempotency_key: request.idempotency_key.clone(),
            status: PaymentStatus::Pending,
            settled_at: None,
            created_at: now,
            updated_at: now,
        };

        let committed = self
            .store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::BookingStatus {
                        booking_id,
                        allowed: vec![booking.status],
                    })
                    .require(Precondition::payments_unchanged(booking_id, &payments))
                    .save(Record::Payment(payment.clone())),
            )
            .await;

        if let Err(err) = committed {
            // A concurrent request with the same key may have won the insert
            if let Some(existing) = self.replay(&booking, &request).await? {
                return Ok(existing);
            }
            return Err(err.into());
        }

        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking_id,
            payment_type = payment.payment_type.as_str(),
            amount = %payment.amount,
            commission = %payment.commission_amount,
            "Payment registered"
        );
        Ok(payment)
    }

    pub async fn get(&self, payment_id: Uuid) -> ApiResult<Payment> {
        self.store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("payment {} not found", payment_id)))
    }

    /// Payments of a booking, oldest first
    pub async fn list_for_booking(&self, booking_id: Uuid) -> ApiResult<Vec<Payment>> {
        Ok(self.store.list_payments(booking_id).await?)
    }

    /// Apply the processor's verdict on a pending payment
    ///
    /// A succeeded deposit confirms its booking and folder in the same commit.
    pub async fn record_outcome(
        &self,
        payment_id: Uuid,
        request: PaymentOutcomeRequest,
    ) -> ApiResult<Payment> {
        let mut payment = self.get(payment_id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(ApiError::Conflict(format!(
                "payment {} already settled as {:?}",
                payment_id, payment.status
            )));
        }

        let now = Utc::now();
        payment.status = match request.outcome {
            PaymentOutcome::Succeeded => PaymentStatus::Succeeded,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        };
        if payment.status == PaymentStatus::Succeeded {
            payment.settled_at = Some(now);
        }
        if let Some(reference) = request.processor_reference.filter(|r| !r.trim().is_empty()) {
            payment.processor_reference = Some(reference);
        }
        payment.updated_at = now;

        let mut unit = UnitOfWork::new();
        if payment.status == PaymentStatus::Succeeded && payment.payment_type == PaymentType::Refund {
            let payments = self.store.list_payments(payment.booking_id).await?;
            let available = refundable(&payments, Some(payment_id));
            if payment.amount > available {
                return Err(ApiError::BadRequest(format!(
                    "refund {} exceeds what booking {} can still return: refundable {}, got {}",
                    payment_id, payment.booking_id, available, payment.amount
                )));
            }
            unit = unit.require(Precondition::payments_unchanged(payment.booking_id, &payments));
        }

        let mut confirmed = None;
        if payment.status == PaymentStatus::Succeeded && payment.payment_type == PaymentType::Deposit {
            let booking = self.store.get_booking(payment.booking_id).await?.ok_or_else(|| {
                ApiError::InternalError(format!(
                    "payment {} references missing booking {}",
                    payment_id, payment.booking_id
                ))
            })?;
            if booking.status == BookingStatus::PendingPayment {
                let folder = self.store.get_folder(booking.folder_id).await?.ok_or_else(|| {
                    ApiError::InternalError(format!(
                        "booking {} references missing folder {}",
                        booking.id, booking.folder_id
                    ))
                })?;
                let (confirmation, booking) = confirmation_unit(booking, folder, now)?;
                unit = confirmation;
                confirmed = Some(booking.id);
            }
        }

        self.store
            .commit(
                unit.require(Precondition::PaymentStatus {
                    payment_id,
                    status: PaymentStatus::Pending,
                })
                .save(Record::Payment(payment.clone())),
            )
            .await?;

        tracing::info!(
            payment_id = %payment_id,
            status = ?payment.status,
            booking_confirmed = ?confirmed,
            "Payment outcome recorded"
        );
        Ok(payment)
    }

    /// An earlier payment under the same key, if the request replays it
    async fn replay(
        &self,
        booking: &Booking,
        request: &CreatePaymentRequest,
    ) -> ApiResult<Option<Payment>> {
        match self
            .store
            .find_payment_by_idempotency_key(&request.idempotency_key)
            .await?
        {
            Some(existing) if existing.same_movement(booking.id, request.payment_type, request.amount) => {
                tracing::debug!(payment_id = %existing.id, "Idempotent payment replay");
                Ok(Some(existing))
            }
            Some(existing) => Err(ApiError::Conflict(format!(
                "idempotency key already used by payment {} with a different payload",
                existing.id
            ))),
            None => Ok(None),
        }
    }

    fn deposit_rate(&self, request: &CreatePaymentRequest) -> ApiResult<Decimal> {
        let rate = request.commission_rate.ok_or_else(|| {
            ApiError::BadRequest("commission_rate is required for a deposit".to_string())
        })?;
        if !self.bounds.contains(rate) {
            return Err(ApiError::BadRequest(format!(
                "commission_rate must be between {} and {}, got {}",
                self.bounds.min, self.bounds.max, rate
            )));
        }
        Ok(rate)
    }

    fn check_deposit(&self, booking: &Booking, payments: &[Payment], amount: Decimal) -> ApiResult<()> {
        if booking.status != BookingStatus::PendingPayment {
            return Err(ApiError::BadRequest(format!(
                "booking {} is {} and takes no deposit",
                booking.id,
                booking.status.as_str()
            )));
        }
        if payments
            .iter()
            .any(|p| p.payment_type == PaymentType::Deposit && p.status != PaymentStatus::Failed)
        {
            return Err(ApiError::BadRequest(format!(
                "booking {} already has a pending or settled deposit",
                booking.id
            )));
        }
        if amount != booking.deposit_amount {
            return Err(ApiError::BadRequest(format!(
                "deposit must equal the booking deposit: expected {}, got {}",
                booking.deposit_amount, amount
            )));
        }
        Ok(())
    }
}

fn check_remaining(booking: &Booking, payments: &[Payment], amount: Decimal) -> ApiResult<()> {
    if !matches!(
        booking.status,
        BookingStatus::Confirmed | BookingStatus::ContactsExchanged | BookingStatus::Completed
    ) {
        return Err(ApiError::BadRequest(format!(
            "booking {} is {}: the remaining amount is due after confirmation",
            booking.id,
            booking.status.as_str()
        )));
    }
    if payments
        .iter()
        .any(|p| p.payment_type == PaymentType::Remaining && p.status != PaymentStatus::Failed)
    {
        return Err(ApiError::BadRequest(format!(
            "booking {} already has a pending or settled remaining payment",
            booking.id
        )));
    }
    if amount != booking.remaining_amount {
        return Err(ApiError::BadRequest(format!(
            "remaining payment must equal the booking remaining amount: expected {}, got {}",
            booking.remaining_amount, amount
        )));
    }
    Ok(())
}

fn check_refund(booking: &Booking, payments: &[Payment], amount: Decimal) -> ApiResult<()> {
    let available = refundable(payments, None);
    if amount > available {
        return Err(ApiError::BadRequest(format!(
            "refund exceeds what booking {} collected: refundable {}, got {}",
            booking.id, available, amount
        )));
    }
    Ok(())
}
