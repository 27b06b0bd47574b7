//! Middleware for the brokerage API
//!
//! Request tracing and caller identity extraction.

mod actor;
mod tracing;

pub use actor::{Actor, ACTOR_HEADER};
pub use self::tracing::request_tracing;
