//! API handlers for the brokerage engine
//!
//! Thin adapters: extract, call the service, wrap the result.

mod bookings;
mod clients;
mod folders;
mod health;
mod leads;
mod movers;
mod payments;
mod quotes;
mod users;

pub use bookings::*;
pub use clients::*;
pub use folders::*;
pub use health::*;
pub use leads::*;
pub use movers::*;
pub use payments::*;
pub use quotes::*;
pub use users::*;
