//! Domain layer for the marketplace listing workflow.
//!
//! This crate provides:
//! - `Price` and `Description` value objects with the engine-enforced bounds
//! - The `Listing` document model mirroring the listing store shape
//! - `ListingState` lifecycle state machine
//! - `SessionContext` carrying the caller's identity into every operation

pub mod custom_data;
pub mod error;
pub mod listing;
pub mod session;
pub mod state;
pub mod value_objects;

pub use error::DomainError;
pub use listing::{
    InventoryItem, ItemDetails, LISTING_ID_PREFIX, Listing, ListingPatch, PaymentMethod,
    SellerInfo,
};
pub use session::SessionContext;
pub use state::ListingState;
pub use value_objects::{Description, MAX_DESCRIPTION_CHARS, MAX_PRICE_YEN, MIN_PRICE_YEN, Price};
