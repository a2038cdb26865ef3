//! External system adapters.
//!
//! Three independently failing systems of record sit behind these
//! traits: the inventory system (item ownership), the listing store
//! (marketplace metadata), and the payment processor (money movement).
//! Each trait ships with an in-memory implementation used as the test
//! double throughout the workspace.

pub mod error;
pub mod inventory;
pub mod payment;
pub mod rpc;
pub mod store;

pub use error::AdapterError;
pub use inventory::{GrantedItem, InMemoryInventorySystem, InventorySystem, ListedItem};
pub use payment::{
    CheckoutRequest, CheckoutSession, InMemoryPaymentProcessor, PaymentProcessor, PaymentStatus,
};
pub use rpc::{RpcData, RpcResponse, TransportError};
pub use store::{BatchOp, InMemoryListingStore, ListingStore, MAX_BATCH_OPS};
