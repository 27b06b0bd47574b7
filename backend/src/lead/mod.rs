//! Prospect intake: leads and their conversion into folders

mod model;
mod service;

pub use model::*;
pub use service::{ConversionOutcome, LeadService};
