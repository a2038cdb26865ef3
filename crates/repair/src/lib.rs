//! Batch reconciliation for the listing store.
//!
//! The listing workflow performs no cross-system transactions, so
//! divergence accumulates: flag pairs violating
//! `is_active == !purchased`, rows with missing or malformed external
//! listing ids, and completed sales whose documents were never
//! removed. The [`Reconciler`] repairs all three with idempotent,
//! chunked batch commits.

pub mod error;
pub mod reconciler;

pub use error::{RepairError, Result};
pub use reconciler::{Reconciler, RepairReport};
