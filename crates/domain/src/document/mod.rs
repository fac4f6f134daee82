//! Document lifecycle: creation with reference assignment, saves, status
//! transitions, fulfillment steps and line management.

mod commands;
mod service;

pub use commands::*;
pub use service::DocumentService;
