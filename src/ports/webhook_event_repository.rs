//! WebhookEventRepository port - append-only audit log of processed webhooks.
//!
//! This port enables idempotent webhook handling: the unique event id is the
//! enforcement point that makes redelivery safe. Unlike a bare seen-id set,
//! each record carries the full payload snapshot and failure annotation for
//! operational forensics.
//!
//! ## Why Webhook Idempotency Matters
//!
//! Stripe may deliver the same webhook multiple times due to:
//! - Network timeouts
//! - 5xx response from our endpoint (triggers retry)
//! - Our endpoint returning success but Stripe not receiving it
//!
//! The record is written only after a handler completes, so a crash
//! mid-handler leaves the event id unclaimed and redelivery retries it.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp};

/// Audit record for one externally delivered event.
#[derive(Debug, Clone)]
pub struct SubscriptionEventRecord {
    /// Stripe event id (evt_xxx format). Unique across all records.
    pub event_id: String,

    /// Dotted event type tag (e.g. "customer.subscription.updated").
    pub event_type: String,

    /// The subscription the event pertains to, when it could be correlated.
    pub subscription_id: Option<SubscriptionId>,

    /// When processing finished.
    pub processed_at: Timestamp,

    /// True when the handler failed with a non-retryable error.
    pub processing_failed: bool,

    /// Error message when processing did not fully succeed.
    pub error_message: Option<String>,

    /// Snapshot of the raw event payload.
    pub payload: serde_json::Value,
}

impl SubscriptionEventRecord {
    /// Creates a record for a fully processed event.
    pub fn processed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        subscription_id: Option<SubscriptionId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            subscription_id,
            processed_at: Timestamp::now(),
            processing_failed: false,
            error_message: None,
            payload,
        }
    }

    /// Creates a record annotated with a non-retryable failure.
    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        subscription_id: Option<SubscriptionId>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            subscription_id,
            processed_at: Timestamp::now(),
            processing_failed: true,
            error_message: Some(error.into()),
            payload,
        }
    }
}

/// Result of attempting to save an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Port for the append-only webhook audit log.
///
/// Implementations should use a database uniqueness constraint on event_id
/// to prevent race conditions during concurrent webhook processing.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a previously recorded event by its Stripe event id.
    ///
    /// Returns `None` if the event hasn't been recorded yet.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<SubscriptionEventRecord>, DomainError>;

    /// Attempt to save an audit record.
    ///
    /// Uses `ON CONFLICT DO NOTHING` semantics to handle race conditions.
    /// Returns `SaveResult::Inserted` if this is the first time seeing the
    /// event, or `SaveResult::AlreadyExists` if another delivery already
    /// inserted it.
    async fn save(&self, record: SubscriptionEventRecord) -> Result<SaveResult, DomainError>;
}
