//! HTTP route handlers.

pub mod health;
pub mod listings;
pub mod metrics;
pub mod repair;
