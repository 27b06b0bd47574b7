//! Offer lifecycle: quotes from movers against folders

mod model;
mod service;

pub use model::*;
pub use service::QuoteService;
