//! Settlement: bookings created from a selected quote

mod model;
mod service;

pub use model::*;
pub(crate) use service::confirmation_unit;
pub use service::BookingService;
