//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::actor::ActorDirectory;
use crate::booking::BookingService;
use crate::client::ClientService;
use crate::config::EnginePolicy;
use crate::folder::FolderService;
use crate::lead::LeadService;
use crate::mover::MoverService;
use crate::payment::PaymentService;
use crate::quote::QuoteService;
use crate::store::MoveStore;
use crate::top3::Top3Service;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub actors: Arc<ActorDirectory>,
    pub lead_service: Arc<LeadService>,
    pub client_service: Arc<ClientService>,
    pub mover_service: Arc<MoverService>,
    pub folder_service: Arc<FolderService>,
    pub quote_service: Arc<QuoteService>,
    pub top3_service: Arc<Top3Service>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    /// Present when backed by Postgres; checked by `/health`
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Wire every service onto one store
    pub fn new(store: Arc<dyn MoveStore>, policy: EnginePolicy, db_pool: Option<PgPool>) -> Self {
        Self {
            actors: Arc::new(ActorDirectory::new(store.clone())),
            lead_service: Arc::new(LeadService::new(store.clone(), policy.conversion)),
            client_service: Arc::new(ClientService::new(store.clone())),
            mover_service: Arc::new(MoverService::new(store.clone())),
            folder_service: Arc::new(FolderService::new(store.clone())),
            quote_service: Arc::new(QuoteService::new(store.clone())),
            top3_service: Arc::new(Top3Service::new(store.clone())),
            booking_service: Arc::new(BookingService::new(store.clone())),
            payment_service: Arc::new(PaymentService::new(store, policy.commission)),
            db_pool,
        }
    }
}

macro_rules! from_ref {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            impl FromRef<AppState> for Arc<$ty> {
                fn from_ref(app_state: &AppState) -> Self {
                    app_state.$field.clone()
                }
            }
        )*
    };
}

from_ref!(
    actors: ActorDirectory,
    lead_service: LeadService,
    client_service: ClientService,
    mover_service: MoverService,
    folder_service: FolderService,
    quote_service: QuoteService,
    top3_service: Top3Service,
    booking_service: BookingService,
    payment_service: PaymentService,
);
