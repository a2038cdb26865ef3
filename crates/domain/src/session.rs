//! Caller session context.

use common::UserId;
use serde::{Deserialize, Serialize};

/// The authenticated caller's identity, threaded explicitly into every
/// workflow operation.
///
/// The session ticket authorizes inventory-system calls made on the
/// caller's behalf. Nothing in the workflow reads ambient global
/// session state; whoever invokes an operation supplies the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Marketplace account of the caller.
    pub user: UserId,
    /// Account email, when known.
    pub email: Option<String>,
    /// Inventory-system session ticket.
    pub session_ticket: String,
}

impl SessionContext {
    /// Creates a session context for a user with a live inventory ticket.
    pub fn new(user: UserId, email: Option<String>, session_ticket: impl Into<String>) -> Self {
        Self {
            user,
            email,
            session_ticket: session_ticket.into(),
        }
    }
}
