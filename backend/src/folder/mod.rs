//! Request lifecycle: folders and their status state machine

mod model;
mod service;

pub use model::*;
pub use service::FolderService;
pub(crate) use service::validated_quote_of;
