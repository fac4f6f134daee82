//! HTTP route handlers.

pub mod documents;
pub mod health;
pub mod metrics;
pub mod reference_data;
