//! Route definitions for the brokerage API

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::middleware::request_tracing;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users", post(register_user))
}

pub fn lead_routes() -> Router<AppState> {
    Router::new()
        .route("/api/leads", post(create_lead).get(list_leads))
        .route("/api/leads/:id", get(get_lead).delete(delete_lead))
        .route("/api/leads/:id/convert", post(convert_lead))
}

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", post(create_client).get(list_clients))
        .route("/api/clients/:id", get(get_client).patch(update_client))
        .route("/api/clients/:id/anonymize", post(anonymize_client))
        .route("/api/clients/:id/folders", get(list_client_folders))
}

pub fn mover_routes() -> Router<AppState> {
    Router::new()
        .route("/api/movers", post(create_mover).get(list_movers))
        .route(
            "/api/movers/:id",
            get(get_mover).patch(update_mover).delete(delete_mover),
        )
        .route("/api/movers/:id/activate", post(activate_mover))
        .route("/api/movers/:id/suspend", post(suspend_mover))
        .route(
            "/api/movers/:id/blacklist",
            post(blacklist_mover).delete(lift_mover_blacklist),
        )
        .route("/api/movers/:id/quotes", get(list_mover_quotes))
}

pub fn folder_routes() -> Router<AppState> {
    Router::new()
        .route("/api/folders", post(create_folder).get(list_folders))
        .route(
            "/api/folders/:id",
            get(get_folder).patch(update_folder).delete(delete_folder),
        )
        .route("/api/folders/:id/request-quotes", post(request_folder_quotes))
        .route("/api/folders/:id/select", post(select_folder_quote))
        .route("/api/folders/:id/quotes", get(list_folder_quotes))
        .route(
            "/api/folders/:id/top3",
            post(build_folder_top3).get(get_folder_top3),
        )
        .route("/api/folders/:id/top3/history", get(list_folder_top3_history))
        .route("/api/folders/:id/bookings", get(list_folder_bookings))
}

pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/api/quotes", post(create_quote))
        .route("/api/maintenance/expire-quotes", post(expire_quotes))
        .route("/api/quotes/:id", get(get_quote).delete(delete_quote))
        .route("/api/quotes/:id/remind", post(remind_quote))
        .route("/api/quotes/:id/validate", post(validate_quote))
        .route("/api/quotes/:id/score", post(score_quote))
}

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/bookings/:id/confirm", post(confirm_booking))
        .route("/api/bookings/:id/exchange-contacts", post(exchange_booking_contacts))
        .route("/api/bookings/:id/complete", post(complete_booking))
        .route("/api/bookings/:id/cancel", post(cancel_booking))
        .route(
            "/api/bookings/:id/payments",
            post(create_payment).get(list_booking_payments),
        )
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/:id", get(get_payment))
        .route("/api/payments/:id/outcome", post(record_payment_outcome))
}

/// Full application router without process-level layers (CORS)
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(user_routes())
        .merge(lead_routes())
        .merge(client_routes())
        .merge(mover_routes())
        .merge(folder_routes())
        .merge(quote_routes())
        .merge(booking_routes())
        .merge(payment_routes())
        .with_state(state)
        .layer(from_fn(request_tracing))
}
