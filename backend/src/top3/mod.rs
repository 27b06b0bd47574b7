//! Shortlist builder: immutable top-three snapshots

mod model;
mod service;

pub use model::*;
pub use service::Top3Service;
