//! Fixtures shared by the engine tests
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::Barrier;
use uuid::Uuid;

use movebroker_server::actor::{RegisterUserRequest, User, UserRole};
use movebroker_server::booking::{Booking, BookingFilter, CreateBookingRequest};
use movebroker_server::client::{Client, ClientFilter, CreateClientRequest};
use movebroker_server::config::EnginePolicy;
use movebroker_server::folder::{CreateFolderRequest, Folder, FolderFilter};
use movebroker_server::lead::{Lead, LeadFilter};
use movebroker_server::models::{PageRequest, PaginatedResponse};
use movebroker_server::mover::{CreateMoverRequest, Mover, MoverFilter};
use movebroker_server::payment::Payment;
use movebroker_server::quote::{
    CreateQuoteRequest, Quote, QuoteFilter, QuoteSource, ScoreQuoteRequest, ValidateQuoteRequest,
};
use movebroker_server::state::AppState;
use movebroker_server::store::{InMemoryStore, MoveStore, StoreResult, UnitOfWork};
use movebroker_server::top3::Top3Selection;

pub const ADMIN: &str = "admin-1";
pub const OPERATOR: &str = "ops-1";

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Every service wired onto a fresh in-memory store, with one operator
pub async fn engine() -> AppState {
    engine_with(EnginePolicy::default()).await
}

pub async fn engine_with(policy: EnginePolicy) -> AppState {
    engine_on(Arc::new(InMemoryStore::new()), policy).await
}

/// Services over the given store, with the admin seeded and one operator
pub async fn engine_on(store: Arc<dyn MoveStore>, policy: EnginePolicy) -> AppState {
    let state = AppState::new(store, policy, None);
    state
        .actors
        .bootstrap_admin(ADMIN, "admin@movebroker.test")
        .await
        .unwrap();
    state
        .actors
        .register(
            ADMIN,
            RegisterUserRequest {
                id: OPERATOR.to_string(),
                email: "ops@movebroker.test".to_string(),
                name: Some("Operations".to_string()),
                role: UserRole::Operator,
                mover_id: None,
            },
        )
        .await
        .unwrap();
    state
}

/// In-memory store whose commits can be held until two are in flight
///
/// Once armed, the next two commits wait for each other, so both racing
/// operations have finished their reads before either one writes.
#[derive(Default)]
pub struct GatedStore {
    inner: InMemoryStore,
    gate: Mutex<Option<Arc<Barrier>>>,
}

impl GatedStore {
    pub fn arm(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Barrier::new(2)));
    }
}

#[async_trait]
impl MoveStore for GatedStore {
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.inner.get_user(id).await
    }
    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        self.inner.get_lead(id).await
    }
    async fn list_leads(&self, filter: &LeadFilter, page: PageRequest) -> StoreResult<PaginatedResponse<Lead>> {
        self.inner.list_leads(filter, page).await
    }
    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        self.inner.get_client(id).await
    }
    async fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>> {
        self.inner.find_client_by_email(email).await
    }
    async fn list_clients(
        &self,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Client>> {
        self.inner.list_clients(filter, page).await
    }
    async fn get_mover(&self, id: Uuid) -> StoreResult<Option<Mover>> {
        self.inner.get_mover(id).await
    }
    async fn find_mover_by_siret(&self, siret: &str) -> StoreResult<Option<Mover>> {
        self.inner.find_mover_by_siret(siret).await
    }
    async fn find_mover_by_email(&self, email: &str) -> StoreResult<Option<Mover>> {
        self.inner.find_mover_by_email(email).await
    }
    async fn list_movers(&self, filter: &MoverFilter, page: PageRequest) -> StoreResult<PaginatedResponse<Mover>> {
        self.inner.list_movers(filter, page).await
    }
    async fn get_folder(&self, id: Uuid) -> StoreResult<Option<Folder>> {
        self.inner.get_folder(id).await
    }
    async fn list_folders(
        &self,
        filter: &FolderFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Folder>> {
        self.inner.list_folders(filter, page).await
    }
    async fn get_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        self.inner.get_quote(id).await
    }
    async fn list_quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        self.inner.list_quotes(filter).await
    }
    async fn list_top3(&self, folder_id: Uuid) -> StoreResult<Vec<Top3Selection>> {
        self.inner.list_top3(folder_id).await
    }
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(id).await
    }
    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        self.inner.list_bookings(filter).await
    }
    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        self.inner.get_payment(id).await
    }
    async fn find_payment_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Payment>> {
        self.inner.find_payment_by_idempotency_key(key).await
    }
    async fn list_payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        self.inner.list_payments(booking_id).await
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        let barrier = self.gate.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            if barrier.wait().await.is_leader() {
                self.gate.lock().unwrap().take();
            }
        }
        self.inner.commit(unit).await
    }
}

pub async fn client(state: &AppState, email: &str) -> Client {
    state
        .client_service
        .create(CreateClientRequest {
            first_name: "Camille".to_string(),
            last_name: "Martin".to_string(),
            email: email.to_string(),
            phone: Some("+33600000000".to_string()),
        })
        .await
        .unwrap()
}

pub fn folder_request(client_id: Uuid) -> CreateFolderRequest {
    CreateFolderRequest {
        client_id,
        origin_address: "12 rue Sainte-Catherine".to_string(),
        origin_city: "Bordeaux".to_string(),
        origin_postal_code: "33000".to_string(),
        origin_floor: Some(2),
        origin_elevator: false,
        destination_address: "5 rue de Rivoli".to_string(),
        destination_city: "Paris".to_string(),
        destination_postal_code: "75001".to_string(),
        destination_floor: Some(4),
        destination_elevator: true,
        volume: d("18.5"),
        distance_km: Some(d("585")),
        moving_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        needs_packing: false,
        needs_storage: false,
        needs_insurance: true,
    }
}

pub async fn folder(state: &AppState) -> Folder {
    let client = client(state, &format!("{}@example.test", Uuid::new_v4())).await;
    state
        .folder_service
        .create(folder_request(client.id))
        .await
        .unwrap()
}

/// An onboarded, activated mover; `n` keeps SIRET and email unique
pub async fn mover(state: &AppState, n: u64) -> Mover {
    let mover = state
        .mover_service
        .create(CreateMoverRequest {
            company_name: format!("Déménagements {}", n),
            siret: format!("{:014}", 73282932000000 + n),
            email: format!("contact{}@movers.test", n),
            phone: None,
            coverage_zones: ["33".to_string(), "75".to_string()].into_iter().collect(),
            rating: Some(d("4.5")),
            review_count: 120,
            financial_risk_score: Some(80),
            litigation_count: 0,
        })
        .await
        .unwrap();
    state.mover_service.activate(mover.id).await.unwrap()
}

pub async fn quote(state: &AppState, folder_id: Uuid, mover_id: Uuid, total: &str) -> Quote {
    state
        .quote_service
        .create(CreateQuoteRequest {
            folder_id,
            mover_id,
            source: QuoteSource::Manual,
            total_amount: d(total),
            currency: None,
            valid_until: None,
        })
        .await
        .unwrap()
}

pub async fn approve(state: &AppState, quote_id: Uuid) -> Quote {
    state
        .quote_service
        .validate(
            quote_id,
            OPERATOR,
            ValidateQuoteRequest {
                approved: true,
                reason: None,
            },
        )
        .await
        .unwrap()
}

pub async fn score(state: &AppState, quote_id: Uuid, price: &str, reputation: &str, financial: &str) -> Quote {
    state
        .quote_service
        .score(
            quote_id,
            ScoreQuoteRequest {
                score_price: d(price),
                score_reputation: d(reputation),
                score_financial: d(financial),
                score_litigation: None,
            },
        )
        .await
        .unwrap()
}

/// A quote that is validated and scored, ready for shortlisting
pub async fn ranked_quote(
    state: &AppState,
    folder_id: Uuid,
    mover_n: u64,
    total: &str,
    scores: (&str, &str, &str),
) -> Quote {
    let mover = mover(state, mover_n).await;
    let created = quote(state, folder_id, mover.id, total).await;
    approve(state, created.id).await;
    score(state, created.id, scores.0, scores.1, scores.2).await
}

/// A folder with one validated, selected quote booked at a 30% deposit
pub async fn pending_booking(state: &AppState, total: &str, deposit: &str) -> Booking {
    let folder = folder(state).await;
    let m = mover(state, 1).await;
    let q = quote(state, folder.id, m.id, total).await;
    approve(state, q.id).await;
    state.folder_service.select_quote(folder.id, q.id).await.unwrap();
    state
        .booking_service
        .create(CreateBookingRequest {
            folder_id: folder.id,
            quote_id: q.id,
            total_amount: d(total),
            deposit_amount: d(deposit),
        })
        .await
        .unwrap()
}
