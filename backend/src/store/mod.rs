//! Persistence interface for the brokerage engine
//!
//! Services read through `MoveStore` and write exclusively through
//! `MoveStore::commit`, handing over a `UnitOfWork`: the preconditions the
//! writes depend on plus the records to save. Adapters apply a unit
//! all-or-nothing and re-check every precondition inside the same
//! transaction, which is what serializes racing operations on one folder.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sqlx::types::chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::actor::User;
use crate::booking::{Booking, BookingFilter, BookingStatus};
use crate::client::{Client, ClientFilter};
use crate::folder::{Folder, FolderFilter, FolderStatus};
use crate::lead::{Lead, LeadFilter, LeadStatus};
use crate::models::{PageRequest, PaginatedResponse};
use crate::mover::{Mover, MoverFilter};
use crate::payment::{Payment, PaymentStatus};
use crate::quote::{Quote, QuoteFilter, QuoteStatus};
use crate::top3::Top3Selection;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Persistence failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A precondition or uniqueness constraint failed; nothing was written
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(format!(
                    "unique constraint violated: {}",
                    db.constraint().unwrap_or("unknown")
                ))
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some("40001") => {
                StoreError::Conflict("concurrent update on the same records, retry".to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record to insert or update, keyed by its id
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    Lead(Lead),
    Client(Client),
    Mover(Mover),
    Folder(Folder),
    Quote(Quote),
    Top3(Top3Selection),
    Booking(Booking),
    Payment(Payment),
}

/// State a unit of work depends on, re-checked at commit time
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    UserIdFree { user_id: String },
    LeadStatus { lead_id: Uuid, status: LeadStatus },
    ClientActive { client_id: Uuid },
    MoverEligible { mover_id: Uuid },
    MoverIdle { mover_id: Uuid },
    /// The mover is live and was not written since it was read
    MoverRevision { mover_id: Uuid, updated_at: DateTime<Utc> },
    FolderStatus { folder_id: Uuid, allowed: Vec<FolderStatus> },
    FolderSelection { folder_id: Uuid, selected: Option<Uuid> },
    /// The folder is live and was not written since it was read
    FolderRevision { folder_id: Uuid, updated_at: DateTime<Utc> },
    QuoteStatus { quote_id: Uuid, allowed: Vec<QuoteStatus> },
    /// Optimistic check: the quote was not written since it was read
    QuoteRevision { quote_id: Uuid, updated_at: DateTime<Utc> },
    QuoteNotSelected { quote_id: Uuid },
    QuoteUnbooked { quote_id: Uuid },
    NoOpenBooking { folder_id: Uuid },
    BookingStatus { booking_id: Uuid, allowed: Vec<BookingStatus> },
    PaymentStatus { payment_id: Uuid, status: PaymentStatus },
    /// The booking's payments are exactly `seen`, by id and status
    PaymentsUnchanged { booking_id: Uuid, seen: Vec<(Uuid, PaymentStatus)> },
}

impl Precondition {
    /// Snapshot of a booking's payments for `PaymentsUnchanged`
    pub fn payments_unchanged(booking_id: Uuid, payments: &[Payment]) -> Self {
        let mut seen: Vec<(Uuid, PaymentStatus)> =
            payments.iter().map(|p| (p.id, p.status)).collect();
        seen.sort_by_key(|(id, _)| *id);
        Precondition::PaymentsUnchanged { booking_id, seen }
    }

    /// Message reported when the precondition no longer holds
    pub fn violation(&self) -> String {
        match self {
            Precondition::UserIdFree { user_id } => format!("user '{}' already exists", user_id),
            Precondition::LeadStatus { lead_id, status } => {
                format!("lead {} is no longer {:?}", lead_id, status)
            }
            Precondition::ClientActive { client_id } => {
                format!("client {} is missing or anonymized", client_id)
            }
            Precondition::MoverEligible { mover_id } => {
                format!("mover {} is missing, deleted or blacklisted", mover_id)
            }
            Precondition::MoverIdle { mover_id } => {
                format!("mover {} gained active quotes or bookings", mover_id)
            }
            Precondition::MoverRevision { mover_id, .. } => {
                format!("mover {} was deleted or modified concurrently", mover_id)
            }
            Precondition::FolderStatus { folder_id, allowed } => {
                format!("folder {} is no longer in one of {:?}", folder_id, allowed)
            }
            Precondition::FolderSelection { folder_id, .. } => {
                format!("folder {} selection changed concurrently", folder_id)
            }
            Precondition::FolderRevision { folder_id, .. } => {
                format!("folder {} was modified concurrently", folder_id)
            }
            Precondition::QuoteStatus { quote_id, allowed } => {
                format!("quote {} is no longer in one of {:?}", quote_id, allowed)
            }
            Precondition::QuoteRevision { quote_id, .. } => {
                format!("quote {} was modified concurrently", quote_id)
            }
            Precondition::QuoteNotSelected { quote_id } => {
                format!("quote {} is selected by its folder", quote_id)
            }
            Precondition::QuoteUnbooked { quote_id } => {
                format!("quote {} is referenced by a booking", quote_id)
            }
            Precondition::NoOpenBooking { folder_id } => {
                format!("folder {} already has an open booking", folder_id)
            }
            Precondition::BookingStatus { booking_id, allowed } => {
                format!("booking {} is no longer in one of {:?}", booking_id, allowed)
            }
            Precondition::PaymentStatus { payment_id, status } => {
                format!("payment {} is no longer {:?}", payment_id, status)
            }
            Precondition::PaymentsUnchanged { booking_id, .. } => {
                format!("payments of booking {} changed concurrently", booking_id)
            }
        }
    }
}

/// Atomic batch of preconditions and record saves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    pub preconditions: Vec<Precondition>,
    pub records: Vec<Record>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn require_all(mut self, preconditions: impl IntoIterator<Item = Precondition>) -> Self {
        self.preconditions.extend(preconditions);
        self
    }

    pub fn save(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Storage abstraction the engine services are built on
///
/// `get_*` return tombstoned rows too (audit lookups); `list_*` exclude them.
#[async_trait]
pub trait MoveStore: Send + Sync {
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>>;
    async fn list_leads(
        &self,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Lead>>;

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>>;
    /// Active (not anonymized) client by case-insensitive email
    async fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>>;
    async fn list_clients(
        &self,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Client>>;

    async fn get_mover(&self, id: Uuid) -> StoreResult<Option<Mover>>;
    /// Live mover by SIRET
    async fn find_mover_by_siret(&self, siret: &str) -> StoreResult<Option<Mover>>;
    /// Live mover by case-insensitive email
    async fn find_mover_by_email(&self, email: &str) -> StoreResult<Option<Mover>>;
    async fn list_movers(
        &self,
        filter: &MoverFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Mover>>;

    async fn get_folder(&self, id: Uuid) -> StoreResult<Option<Folder>>;
    async fn list_folders(
        &self,
        filter: &FolderFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Folder>>;

    async fn get_quote(&self, id: Uuid) -> StoreResult<Option<Quote>>;
    /// Live quotes in listing order (score desc, newest first)
    async fn list_quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>>;

    /// Snapshots of a folder, newest first
    async fn list_top3(&self, folder_id: Uuid) -> StoreResult<Vec<Top3Selection>>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    /// Bookings matching the filter, newest first
    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;
    async fn find_payment_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Payment>>;
    /// Payments of a booking, oldest first
    async fn list_payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>>;

    /// Apply a unit of work atomically
    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()>;
}
