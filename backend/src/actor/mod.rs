//! Actor identities and role resolution
//!
//! The boundary hands the engine an opaque actor id; role membership is
//! resolved here against the user directory.

mod model;
mod service;

pub use model::*;
pub use service::ActorDirectory;
