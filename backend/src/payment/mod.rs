//! Settlement: payments and the platform/mover revenue split

mod model;
mod service;

pub use model::*;
pub use service::PaymentService;
