//! Shared identifier types for the marketplace workflow.

pub mod types;

pub use types::{CatalogItemId, ItemInstanceId, ListingId, PlayerId, SessionId, UserId};
