//! In-process store used by tests and local runs without a database

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MoveStore, Precondition, Record, StoreError, StoreResult, UnitOfWork};
use crate::actor::User;
use crate::booking::{Booking, BookingFilter};
use crate::client::{normalize_email, Client, ClientFilter};
use crate::folder::{Folder, FolderFilter};
use crate::lead::{Lead, LeadFilter};
use crate::models::{PageRequest, PaginatedResponse};
use crate::mover::{Mover, MoverFilter};
use crate::payment::{Payment, PaymentStatus, PaymentType};
use crate::quote::{listing_order, Quote, QuoteFilter};
use crate::top3::Top3Selection;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    leads: HashMap<Uuid, Lead>,
    clients: HashMap<Uuid, Client>,
    movers: HashMap<Uuid, Mover>,
    folders: HashMap<Uuid, Folder>,
    quotes: HashMap<Uuid, Quote>,
    top3: HashMap<Uuid, Top3Selection>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    /// Upsert a record, returning the row it replaced
    fn put(&mut self, record: Record) -> Option<Record> {
        match record {
            Record::User(r) => self.users.insert(r.id.clone(), r).map(Record::User),
            Record::Lead(r) => self.leads.insert(r.id, r).map(Record::Lead),
            Record::Client(r) => self.clients.insert(r.id, r).map(Record::Client),
            Record::Mover(r) => self.movers.insert(r.id, r).map(Record::Mover),
            Record::Folder(r) => self.folders.insert(r.id, r).map(Record::Folder),
            Record::Quote(r) => self.quotes.insert(r.id, r).map(Record::Quote),
            Record::Top3(r) => self.top3.insert(r.id, r).map(Record::Top3),
            Record::Booking(r) => self.bookings.insert(r.id, r).map(Record::Booking),
            Record::Payment(r) => self.payments.insert(r.id, r).map(Record::Payment),
        }
    }

    fn remove(&mut self, record: &Record) {
        match record {
            Record::User(r) => {
                self.users.remove(&r.id);
            }
            Record::Lead(r) => {
                self.leads.remove(&r.id);
            }
            Record::Client(r) => {
                self.clients.remove(&r.id);
            }
            Record::Mover(r) => {
                self.movers.remove(&r.id);
            }
            Record::Folder(r) => {
                self.folders.remove(&r.id);
            }
            Record::Quote(r) => {
                self.quotes.remove(&r.id);
            }
            Record::Top3(r) => {
                self.top3.remove(&r.id);
            }
            Record::Booking(r) => {
                self.bookings.remove(&r.id);
            }
            Record::Payment(r) => {
                self.payments.remove(&r.id);
            }
        }
    }

    fn holds(&self, precondition: &Precondition) -> bool {
        match precondition {
            Precondition::UserIdFree { user_id } => !self.users.contains_key(user_id),
            Precondition::LeadStatus { lead_id, status } => self
                .leads
                .get(lead_id)
                .map_or(false, |l| l.deleted_at.is_none() && l.status == *status),
            Precondition::ClientActive { client_id } => self
                .clients
                .get(client_id)
                .map_or(false, |c| !c.is_anonymized()),
            Precondition::MoverEligible { mover_id } => self
                .movers
                .get(mover_id)
                .map_or(false, |m| m.deleted_at.is_none() && !m.blacklisted),
            Precondition::MoverIdle { mover_id } => {
                !self.quotes.values().any(|q| {
                    q.mover_id == *mover_id && q.deleted_at.is_none() && q.status.is_active()
                }) && !self
                    .bookings
                    .values()
                    .any(|b| b.mover_id == *mover_id && b.is_open())
            }
            Precondition::MoverRevision {
                mover_id,
                updated_at,
            } => self
                .movers
                .get(mover_id)
                .map_or(false, |m| m.deleted_at.is_none() && m.updated_at == *updated_at),
            Precondition::FolderStatus { folder_id, allowed } => self
                .folders
                .get(folder_id)
                .map_or(false, |f| f.deleted_at.is_none() && allowed.contains(&f.status)),
            Precondition::FolderSelection {
                folder_id,
                selected,
            } => self
                .folders
                .get(folder_id)
                .map_or(false, |f| f.deleted_at.is_none() && f.selected_quote_id == *selected),
            Precondition::FolderRevision {
                folder_id,
                updated_at,
            } => self
                .folders
                .get(folder_id)
                .map_or(false, |f| f.deleted_at.is_none() && f.updated_at == *updated_at),
            Precondition::QuoteStatus { quote_id, allowed } => self
                .quotes
                .get(quote_id)
                .map_or(false, |q| q.deleted_at.is_none() && allowed.contains(&q.status)),
            Precondition::QuoteRevision {
                quote_id,
                updated_at,
            } => self
                .quotes
                .get(quote_id)
                .map_or(false, |q| q.updated_at == *updated_at),
            Precondition::QuoteNotSelected { quote_id } => !self
                .folders
                .values()
                .any(|f| f.deleted_at.is_none() && f.selected_quote_id == Some(*quote_id)),
            Precondition::QuoteUnbooked { quote_id } => {
                !self.bookings.values().any(|b| b.quote_id == *quote_id)
            }
            Precondition::NoOpenBooking { folder_id } => !self
                .bookings
                .values()
                .any(|b| b.folder_id == *folder_id && b.is_open()),
            Precondition::BookingStatus {
                booking_id,
                allowed,
            } => self
                .bookings
                .get(booking_id)
                .map_or(false, |b| allowed.contains(&b.status)),
            Precondition::PaymentStatus { payment_id, status } => self
                .payments
                .get(payment_id)
                .map_or(false, |p| p.status == *status),
            Precondition::PaymentsUnchanged { booking_id, seen } => {
                let mut current: Vec<(Uuid, PaymentStatus)> = self
                    .payments
                    .values()
                    .filter(|p| p.booking_id == *booking_id)
                    .map(|p| (p.id, p.status))
                    .collect();
                current.sort_by_key(|(id, _)| *id);
                current == *seen
            }
        }
    }

    /// Uniqueness rules mirrored from the Postgres schema
    fn constraint_violation(&self, record: &Record) -> Option<String> {
        match record {
            Record::Client(c) if !c.is_anonymized() => {
                let email = normalize_email(&c.email);
                self.clients
                    .values()
                    .any(|o| {
                        o.id != c.id && !o.is_anonymized() && normalize_email(&o.email) == email
                    })
                    .then(|| format!("client email '{}' already in use", email))
            }
            Record::Mover(m) if m.deleted_at.is_none() => {
                let email = normalize_email(&m.email);
                self.movers
                    .values()
                    .filter(|o| o.id != m.id && o.deleted_at.is_none())
                    .find_map(|o| {
                        if o.siret == m.siret {
                            Some(format!("mover siret '{}' already registered", m.siret))
                        } else if normalize_email(&o.email) == email {
                            Some(format!("mover email '{}' already registered", email))
                        } else {
                            None
                        }
                    })
            }
            Record::Folder(f) => f.lead_id.and_then(|lead_id| {
                self.folders
                    .values()
                    .any(|o| o.id != f.id && o.lead_id == Some(lead_id))
                    .then(|| format!("lead {} already converted", lead_id))
            }),
            Record::Quote(q) if q.deleted_at.is_none() && q.status.is_active() => self
                .quotes
                .values()
                .any(|o| {
                    o.id != q.id
                        && o.folder_id == q.folder_id
                        && o.mover_id == q.mover_id
                        && o.deleted_at.is_none()
                        && o.status.is_active()
                })
                .then(|| {
                    format!(
                        "mover {} already has an active quote on folder {}",
                        q.mover_id, q.folder_id
                    )
                }),
            Record::Booking(b) if b.is_open() => self
                .bookings
                .values()
                .any(|o| o.id != b.id && o.folder_id == b.folder_id && o.is_open())
                .then(|| format!("folder {} already has an open booking", b.folder_id)),
            Record::Payment(p) => {
                if self
                    .payments
                    .values()
                    .any(|o| o.id != p.id && o.idempotency_key == p.idempotency_key)
                {
                    return Some(format!("idempotency key '{}' already used", p.idempotency_key));
                }
                let collection =
                    matches!(p.payment_type, PaymentType::Deposit | PaymentType::Remaining);
                (collection
                    && p.status != PaymentStatus::Failed
                    && self.payments.values().any(|o| {
                        o.id != p.id
                            && o.booking_id == p.booking_id
                            && o.payment_type == p.payment_type
                            && o.status != PaymentStatus::Failed
                    }))
                .then(|| {
                    format!(
                        "booking {} already has a {} payment",
                        p.booking_id,
                        p.payment_type.as_str()
                    )
                })
            }
            _ => None,
        }
    }
}

/// Store keeping every table in memory behind one lock
///
/// `commit` holds the write lock for the whole unit, so units are applied
/// one at a time exactly like serializable transactions.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl MoveStore for InMemoryStore {
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        Ok(self.tables.read().await.leads.get(&id).cloned())
    }

    async fn list_leads(
        &self,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Lead>> {
        let tables = self.tables.read().await;
        let mut leads: Vec<Lead> = tables
            .leads
            .values()
            .filter(|l| l.deleted_at.is_none())
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        newest_first(&mut leads, |l| (l.created_at, l.id));
        Ok(PaginatedResponse::from_vec(leads, page))
    }

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .find(|c| !c.is_anonymized() && normalize_email(&c.email) == email)
            .cloned())
    }

    async fn list_clients(
        &self,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Client>> {
        let tables = self.tables.read().await;
        let mut clients: Vec<Client> = tables
            .clients
            .values()
            .filter(|c| filter.include_anonymized || !c.is_anonymized())
            .cloned()
            .collect();
        newest_first(&mut clients, |c| (c.created_at, c.id));
        Ok(PaginatedResponse::from_vec(clients, page))
    }

    async fn get_mover(&self, id: Uuid) -> StoreResult<Option<Mover>> {
        Ok(self.tables.read().await.movers.get(&id).cloned())
    }

    async fn find_mover_by_siret(&self, siret: &str) -> StoreResult<Option<Mover>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movers
            .values()
            .find(|m| m.deleted_at.is_none() && m.siret == siret)
            .cloned())
    }

    async fn find_mover_by_email(&self, email: &str) -> StoreResult<Option<Mover>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .movers
            .values()
            .find(|m| m.deleted_at.is_none() && normalize_email(&m.email) == email)
            .cloned())
    }

    async fn list_movers(
        &self,
        filter: &MoverFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Mover>> {
        let tables = self.tables.read().await;
        let mut movers: Vec<Mover> = tables
            .movers
            .values()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| filter.zone.as_deref().map_or(true, |z| m.covers(z)))
            .cloned()
            .collect();
        newest_first(&mut movers, |m| (m.created_at, m.id));
        Ok(PaginatedResponse::from_vec(movers, page))
    }

    async fn get_folder(&self, id: Uuid) -> StoreResult<Option<Folder>> {
        Ok(self.tables.read().await.folders.get(&id).cloned())
    }

    async fn list_folders(
        &self,
        filter: &FolderFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Folder>> {
        let tables = self.tables.read().await;
        let mut folders: Vec<Folder> = tables
            .folders
            .values()
            .filter(|f| f.deleted_at.is_none())
            .filter(|f| filter.client_id.map_or(true, |id| f.client_id == id))
            .filter(|f| filter.status.map_or(true, |s| f.status == s))
            .cloned()
            .collect();
        newest_first(&mut folders, |f| (f.created_at, f.id));
        Ok(PaginatedResponse::from_vec(folders, page))
    }

    async fn get_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        Ok(self.tables.read().await.quotes.get(&id).cloned())
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        let tables = self.tables.read().await;
        let mut quotes: Vec<Quote> = tables
            .quotes
            .values()
            .filter(|q| q.deleted_at.is_none() && filter.matches(q))
            .cloned()
            .collect();
        quotes.sort_by(|a, b| listing_order(a, b).then_with(|| a.id.cmp(&b.id)));
        Ok(quotes)
    }

    async fn list_top3(&self, folder_id: Uuid) -> StoreResult<Vec<Top3Selection>> {
        let tables = self.tables.read().await;
        let mut snapshots: Vec<Top3Selection> = tables
            .top3
            .values()
            .filter(|t| t.folder_id == folder_id)
            .cloned()
            .collect();
        newest_first(&mut snapshots, |t| (t.presented_at, t.id));
        Ok(snapshots)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| (b.created_at, b.id));
        Ok(bookings)
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn find_payment_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.idempotency_key == key)
            .cloned())
    }

    async fn list_payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.created_at, p.id));
        Ok(payments)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if let Some(failed) = unit.preconditions.iter().find(|p| !tables.holds(p)) {
            return Err(StoreError::Conflict(failed.violation()));
        }

        let mut applied: Vec<(Record, Option<Record>)> = Vec::with_capacity(unit.records.len());
        for record in unit.records {
            let previous = tables.put(record.clone());
            applied.push((record, previous));
        }

        let violation = applied
            .iter()
            .find_map(|(record, _)| tables.constraint_violation(record));

        if let Some(message) = violation {
            for (record, previous) in applied.into_iter().rev() {
                match previous {
                    Some(previous) => {
                        tables.put(previous);
                    }
                    None => tables.remove(&record),
                }
            }
            return Err(StoreError::Conflict(message));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::UserRole;
    use chrono::Utc;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: None,
            role: UserRole::Operator,
            mover_id: None,
            created_at: Utc::now(),
        }
    }

    fn client(email: &str) -> Client {
        let now = Utc::now();
        Client {
            id: Uuid::new_v4(),
            first_name: "Jeanne".to_string(),
            last_name: "Martin".to_string(),
            email: email.to_string(),
            phone: None,
            anonymized_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_failed_precondition_writes_nothing() {
        let store = InMemoryStore::new();
        store
            .commit(UnitOfWork::new().save(Record::User(user("ops-1"))))
            .await
            .unwrap();

        let c = client("jeanne@example.com");
        let err = store
            .commit(
                UnitOfWork::new()
                    .require(Precondition::UserIdFree {
                        user_id: "ops-1".to_string(),
                    })
                    .save(Record::Client(c.clone())),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_client(c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_constraint_violation_rolls_back_whole_unit() {
        let store = InMemoryStore::new();
        store
            .commit(UnitOfWork::new().save(Record::Client(client("jeanne@example.com"))))
            .await
            .unwrap();

        let duplicate = client("JEANNE@example.com");
        let err = store
            .commit(
                UnitOfWork::new()
                    .save(Record::User(user("ops-2")))
                    .save(Record::Client(duplicate)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_user("ops-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_anonymized_clients_release_their_email() {
        let store = InMemoryStore::new();
        let mut first = client("jeanne@example.com");
        first.anonymized_at = Some(Utc::now());
        store
            .commit(UnitOfWork::new().save(Record::Client(first)))
            .await
            .unwrap();

        store
            .commit(UnitOfWork::new().save(Record::Client(client("jeanne@example.com"))))
            .await
            .unwrap();

        let found = store.find_client_by_email("Jeanne@Example.com").await.unwrap();
        assert!(found.is_some_and(|c| !c.is_anonymized()));
    }

    fn payment(booking_id: Uuid, payment_type: PaymentType, status: PaymentStatus) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            booking_id,
            payment_type,
            amount: rust_decimal::Decimal::new(30000, 2),
            commission_rate: None,
            commission_amount: rust_decimal::Decimal::ZERO,
            provider_net_amount: rust_decimal::Decimal::new(30000, 2),
            processor_reference: None,
            idempotency_key: Uuid::new_v4().to_string(),
            status,
            settled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_one_live_collection_per_type() {
        let store = InMemoryStore::new();
        let booking_id = Uuid::new_v4();
        store
            .commit(UnitOfWork::new().save(Record::Payment(payment(
                booking_id,
                PaymentType::Deposit,
                PaymentStatus::Failed,
            ))))
            .await
            .unwrap();
        store
            .commit(UnitOfWork::new().save(Record::Payment(payment(
                booking_id,
                PaymentType::Deposit,
                PaymentStatus::Pending,
            ))))
            .await
            .unwrap();

        let err = store
            .commit(UnitOfWork::new().save(Record::Payment(payment(
                booking_id,
                PaymentType::Deposit,
                PaymentStatus::Pending,
            ))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("deposit")));

        for _ in 0..2 {
            store
                .commit(UnitOfWork::new().save(Record::Payment(payment(
                    booking_id,
                    PaymentType::Refund,
                    PaymentStatus::Pending,
                ))))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_payment_set_snapshot_goes_stale() {
        let store = InMemoryStore::new();
        let booking_id = Uuid::new_v4();
        let deposit = payment(booking_id, PaymentType::Deposit, PaymentStatus::Succeeded);
        store
            .commit(UnitOfWork::new().save(Record::Payment(deposit.clone())))
            .await
            .unwrap();

        let seen = store.list_payments(booking_id).await.unwrap();
        let snapshot = Precondition::payments_unchanged(booking_id, &seen);
        store
            .commit(UnitOfWork::new().require(snapshot.clone()).save(Record::Payment(
                payment(booking_id, PaymentType::Refund, PaymentStatus::Pending),
            )))
            .await
            .unwrap();

        let err = store
            .commit(UnitOfWork::new().require(snapshot).save(Record::Payment(payment(
                booking_id,
                PaymentType::Refund,
                PaymentStatus::Pending,
            ))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("changed concurrently")));
        assert_eq!(store.list_payments(booking_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mover_revision_rejects_stale_and_deleted_rows() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut mover = Mover {
            id: Uuid::new_v4(),
            company_name: "Demenagements Garonne".to_string(),
            siret: "12345678901234".to_string(),
            email: "contact@garonne.fr".to_string(),
            phone: None,
            coverage_zones: Default::default(),
            rating: None,
            review_count: 0,
            financial_risk_score: None,
            litigation_count: 0,
            blacklisted: false,
            blacklist_reason: None,
            status: crate::mover::MoverStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store
            .commit(UnitOfWork::new().save(Record::Mover(mover.clone())))
            .await
            .unwrap();
        let read = Precondition::MoverRevision {
            mover_id: mover.id,
            updated_at: now,
        };

        let later = now + chrono::Duration::seconds(1);
        mover.deleted_at = Some(later);
        mover.updated_at = later;
        store
            .commit(UnitOfWork::new().require(read.clone()).save(Record::Mover(mover.clone())))
            .await
            .unwrap();

        mover.deleted_at = None;
        let err = store
            .commit(UnitOfWork::new().require(read).save(Record::Mover(mover.clone())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let revived = Precondition::MoverRevision {
            mover_id: mover.id,
            updated_at: later,
        };
        let err = store
            .commit(UnitOfWork::new().require(revived).save(Record::Mover(mover)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("deleted")));
    }
}
