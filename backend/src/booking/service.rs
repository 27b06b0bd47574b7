use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::model::{settle_amounts, Booking, BookingFilter, BookingStatus, CreateBookingRequest};
use crate::error::{ApiError, ApiResult};
use crate::folder::{validated_quote_of, Folder, FolderStatus};
use crate::lifecycle::{require_live, LifecycleGuard};
use crate::models::ensure_cents;
use crate::payment::{PaymentStatus, PaymentType};
use crate::store::{MoveStore, Precondition, Record, UnitOfWork};

/// Move a booking along, refusing anything outside `from`
fn advance(
    booking: &mut Booking,
    from: &[BookingStatus],
    next: BookingStatus,
    now: DateTime<Utc>,
) -> ApiResult<Precondition> {
    if !from.contains(&booking.status) {
        return Err(ApiError::BadRequest(format!(
            "booking {} cannot move from {} to {}",
            booking.id,
            booking.status.as_str(),
            next.as_str()
        )));
    }
    let guard = Precondition::BookingStatus {
        booking_id: booking.id,
        allowed: vec![booking.status],
    };
    booking.status = next;
    booking.updated_at = now;
    Ok(guard)
}

/// Records confirming a booking once its deposit has settled
///
/// Shared with payment settlement so the payment, booking and folder land
/// in one unit of work.
pub(crate) fn confirmation_unit(
    mut booking: Booking,
    mut folder: Folder,
    now: DateTime<Utc>,
) -> ApiResult<(UnitOfWork, Booking)> {
    let booking_guard = advance(
        &mut booking,
        &[BookingStatus::PendingPayment],
        BookingStatus::Confirmed,
        now,
    )?;
    booking.confirmed_at = Some(now);

    let previous = folder.transition(FolderStatus::Confirmed, now)?;
    let unit = UnitOfWork::new()
        .require(booking_guard)
        .require(Precondition::FolderStatus {
            folder_id: folder.id,
            allowed: vec![previous],
        })
        .save(Record::Booking(booking.clone()))
        .save(Record::Folder(folder));
    Ok((unit, booking))
}

/// Service for bookings created from a selected quote
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn MoveStore>,
    guard: LifecycleGuard,
}

impl BookingService {
    pub fn new(store: Arc<dyn MoveStore>) -> Self {
        Self {
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// Book the selected quote with a 30% deposit
    ///
    /// The folder moves to `AwaitingPayment` with the quote selected, in the
    /// same unit of work as the booking insert. A folder that already has a
    /// selection can only book that quote.
    pub async fn create(&self, request: CreateBookingRequest) -> ApiResult<Booking> {
        let mut folder = require_live(
            self.store.get_folder(request.folder_id).await?,
            "folder",
            request.folder_id,
        )?;
        let quote = validated_quote_of(self.store.as_ref(), &folder, request.quote_id).await?;
        if let Some(selected) = folder.selected_quote_id.filter(|s| *s != quote.id) {
            return Err(ApiError::BadRequest(format!(
                "folder {} has quote {} selected, not {}",
                folder.id, selected, quote.id
            )));
        }

        ensure_cents("total_amount", request.total_amount)?;
        ensure_cents("deposit_amount", request.deposit_amount)?;
        let remaining = settle_amounts(request.total_amount, request.deposit_amount)?;

        let open = self.guard.open_bookings_for_folder(folder.id).await?;
        if open > 0 {
            return Err(ApiError::Conflict(format!(
                "folder {} already has an open booking",
                folder.id
            )));
        }

        let mover = self.store.get_mover(quote.mover_id).await?;
        if mover.as_ref().map_or(true, |m| m.deleted_at.is_some() || m.blacklisted) {
            return Err(ApiError::BadRequest(format!(
                "mover {} of quote {} is no longer eligible",
                quote.mover_id, quote.id
            )));
        }

        let now = Utc::now();
        let read_at = folder.updated_at;
        let previous_selection = folder.selected_quote_id;
        let previous = folder.transition(FolderStatus::AwaitingPayment, now)?;
        folder.selected_quote_id = Some(quote.id);

        let booking = Booking {
            id: Uuid::new_v4(),
            folder_id: folder.id,
            quote_id: quote.id,
            mover_id: quote.mover_id,
            total_amount: request.total_amount,
            deposit_amount: request.deposit_amount,
            remaining_amount: remaining,
            status: BookingStatus::PendingPayment,
            confirmed_at: None,
            contacts_exchanged_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::FolderRevision {
                        folder_id: folder.id,
                        updated_at: read_at,
                    })
                    .require(Precondition::FolderStatus {
                        folder_id: folder.id,
                        allowed: vec![previous],
                    })
                    .require(Precondition::FolderSelection {
                        folder_id: folder.id,
                        selected: previous_selection,
                    })
                    .require(Precondition::QuoteStatus {
                        quote_id: quote.id,
                        allowed: vec![crate::quote::QuoteStatus::Validated],
                    })
                    .require(Precondition::NoOpenBooking {
                        folder_id: folder.id,
                    })
                    .require(Precondition::MoverEligible {
                        mover_id: quote.mover_id,
                    })
                    .save(Record::Booking(booking.clone()))
                    .save(Record::Folder(folder)),
            )
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            folder_id = %booking.folder_id,
            quote_id = %booking.quote_id,
            total = %booking.total_amount,
            deposit = %booking.deposit_amount,
            "Booking created"
        );
        Ok(booking)
    }

    pub async fn get(&self, booking_id: Uuid) -> ApiResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("booking {} not found", booking_id)))
    }

    /// Bookings of a folder, newest first
    pub async fn list_for_folder(&self, folder_id: Uuid) -> ApiResult<Vec<Booking>> {
        let filter = BookingFilter {
            folder_id: Some(folder_id),
            ..Default::default()
        };
        Ok(self.store.list_bookings(&filter).await?)
    }

    /// Confirm a booking whose deposit has already succeeded
    pub async fn confirm(&self, booking_id: Uuid) -> ApiResult<Booking> {
        let booking = self.get(booking_id).await?;
        let deposit_settled = self
            .store
            .list_payments(booking_id)
            .await?
            .iter()
            .any(|p| p.payment_type == PaymentType::Deposit && p.status == PaymentStatus::Succeeded);
        if !deposit_settled {
            return Err(ApiError::BadRequest(format!(
                "booking {} has no settled deposit",
                booking_id
            )));
        }

        let folder = self.owning_folder(&booking).await?;
        let (unit, booking) = confirmation_unit(booking, folder, Utc::now())?;
        self.store.commit(unit).await?;

        tracing::info!(booking_id = %booking_id, "Booking confirmed");
        Ok(booking)
    }

    /// Release contact details to both parties
    pub async fn exchange_contacts(&self, booking_id: Uuid) -> ApiResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        let now = Utc::now();
        let guard = advance(
            &mut booking,
            &[BookingStatus::Confirmed],
            BookingStatus::ContactsExchanged,
            now,
        )?;
        booking.contacts_exchanged_at = Some(now);

        self.save(&booking, guard).await?;
        tracing::info!(booking_id = %booking_id, "Contacts exchanged");
        Ok(booking)
    }

    /// Mark the move as done
    pub async fn complete(&self, booking_id: Uuid) -> ApiResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        let now = Utc::now();
        let guard = advance(
            &mut booking,
            &[BookingStatus::Confirmed, BookingStatus::ContactsExchanged],
            BookingStatus::Completed,
            now,
        )?;
        booking.completed_at = Some(now);

        self.save(&booking, guard).await?;
        tracing::info!(booking_id = %booking_id, "Booking completed");
        Ok(booking)
    }

    /// Cancel an open booking
    ///
    /// A folder still awaiting payment returns to `Top3Ready` with its
    /// selection cleared; a confirmed folder is terminal and stays as is.
    pub async fn cancel(&self, booking_id: Uuid) -> ApiResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        let now = Utc::now();
        let guard = advance(&mut booking, &BookingStatus::OPEN, BookingStatus::Cancelled, now)?;
        booking.cancelled_at = Some(now);

        let mut unit = UnitOfWork::new()
            .require(guard)
            .save(Record::Booking(booking.clone()));

        let mut folder = self.owning_folder(&booking).await?;
        if folder.status == FolderStatus::AwaitingPayment {
            let previous = folder.transition(FolderStatus::Top3Ready, now)?;
            folder.selected_quote_id = None;
            unit = unit
                .require(Precondition::FolderStatus {
                    folder_id: folder.id,
                    allowed: vec![previous],
                })
                .save(Record::Folder(folder));
        }

        self.store.commit(unit).await?;
        tracing::info!(booking_id = %booking_id, "Booking cancelled");
        Ok(booking)
    }

    async fn owning_folder(&self, booking: &Booking) -> ApiResult<Folder> {
        self.store.get_folder(booking.folder_id).await?.ok_or_else(|| {
            ApiError::InternalError(format!(
                "booking {} references missing folder {}",
                booking.id, booking.folder_id
            ))
        })
    }

    async fn save(&self, booking: &Booking, guard: Precondition) -> ApiResult<()> {
        self.store
            .commit(
                UnitOfWork::new()
                    .require(guard)
                    .save(Record::Booking(booking.clone())),
            )
            .await?;
        Ok(())
    }
}
