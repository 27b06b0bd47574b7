//! Move brokerage engine
//!
//! Leads become folders, movers quote against them, the best three quotes
//! are shortlisted and one is booked and paid for. Services run over a
//! `MoveStore`; the axum boundary in `handlers`/`routes` is a thin adapter.

pub mod actor;
pub mod booking;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod folder;
pub mod handlers;
pub mod lead;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod mover;
pub mod payment;
pub mod quote;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod top3;
