//! Listing lifecycle workflow.
//!
//! The engine in this crate drives each marketplace operation as an
//! ordered sequence of adapter calls, with the ordering chosen so that
//! partial failure leaves the systems in a state the reconciliation
//! service can repair. Settlement of a purchase is pluggable through
//! [`PurchaseStrategy`].

pub mod engine;
pub mod error;
pub mod outcome;
pub mod strategy;

pub use engine::{ListingWorkflow, PollPolicy};
pub use error::{Result, WorkflowError};
pub use outcome::{CancelOutcome, ConfirmOutcome, ListOutcome, PurchaseOutcome, Warning};
pub use strategy::{CheckoutStrategy, MockStrategy, PurchaseStrategy, Settlement};
