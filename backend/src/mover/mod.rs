//! Provider onboarding, blacklisting and retirement

mod model;
mod service;

pub use model::*;
pub use service::MoverService;
