//! Payment processor adapter trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ListingId, SessionId};
use domain::Price;

use crate::error::AdapterError;

/// Parameters for creating a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub listing_id: ListingId,
    pub amount: Price,
    pub title: String,
    pub description: String,
}

/// A created checkout session the buyer is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: SessionId,
    pub checkout_url: String,
}

/// Completion status of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Checkout created, money not yet captured.
    Pending,
    /// Payment captured.
    Completed,
    /// Payment declined or abandoned.
    Failed,
}

/// The external service handling real-money checkout and settlement.
///
/// Sessions are created synchronously; completion is observed later by
/// polling `status` with the session id handed back on redirect
/// return.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a checkout session and returns the redirect URL.
    async fn create_session(&self, req: CheckoutRequest) -> Result<CheckoutSession, AdapterError>;

    /// Reports the current status of a session.
    async fn status(&self, session_id: &SessionId) -> Result<PaymentStatus, AdapterError>;
}

#[derive(Debug)]
struct SessionRecord {
    listing_id: ListingId,
    amount: Price,
    status: PaymentStatus,
    /// Remaining polls that still report `Pending` before the stored
    /// status takes effect; exercises the confirmation retry loop.
    pending_polls: u32,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    sessions: HashMap<SessionId, SessionRecord>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment processor for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentProcessor {
    /// Creates a new in-memory payment processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures session creation to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Marks a session as completed.
    pub fn complete_session(&self, session_id: &SessionId) {
        if let Some(record) = self.state.write().unwrap().sessions.get_mut(session_id) {
            record.status = PaymentStatus::Completed;
        }
    }

    /// Marks a session completed, but only after `polls` further
    /// status checks have reported `Pending`.
    pub fn complete_session_after(&self, session_id: &SessionId, polls: u32) {
        if let Some(record) = self.state.write().unwrap().sessions.get_mut(session_id) {
            record.status = PaymentStatus::Completed;
            record.pending_polls = polls;
        }
    }

    /// Marks a session as failed.
    pub fn fail_session(&self, session_id: &SessionId) {
        if let Some(record) = self.state.write().unwrap().sessions.get_mut(session_id) {
            record.status = PaymentStatus::Failed;
        }
    }

    /// Number of sessions created.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// The listing and amount a session was created for.
    pub fn session_details(&self, session_id: &SessionId) -> Option<(ListingId, Price)> {
        self.state
            .read()
            .unwrap()
            .sessions
            .get(session_id)
            .map(|r| (r.listing_id.clone(), r.amount))
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_session(&self, req: CheckoutRequest) -> Result<CheckoutSession, AdapterError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(AdapterError::RemoteUnavailable(
                "payment processor unreachable".to_string(),
            ));
        }

        state.next_id += 1;
        let session_id = SessionId::new(format!("cs_test_{:04}", state.next_id));
        let checkout_url = format!("https://checkout.example.com/pay/{session_id}");
        state.sessions.insert(
            session_id.clone(),
            SessionRecord {
                listing_id: req.listing_id,
                amount: req.amount,
                status: PaymentStatus::Pending,
                pending_polls: 0,
            },
        );

        Ok(CheckoutSession {
            session_id,
            checkout_url,
        })
    }

    async fn status(&self, session_id: &SessionId) -> Result<PaymentStatus, AdapterError> {
        let mut state = self.state.write().unwrap();
        let record = state.sessions.get_mut(session_id).ok_or_else(|| {
            AdapterError::RemoteRejected(format!("unknown payment session: {session_id}"))
        })?;

        if record.pending_polls > 0 {
            record.pending_polls -= 1;
            return Ok(PaymentStatus::Pending);
        }
        Ok(record.status)
    }
}
