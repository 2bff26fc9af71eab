//! Billing domain module.
//!
//! Reconciles asynchronous lifecycle events from the billing provider into
//! the local view of "does this user have an active subscription", despite
//! at-least-once delivery, out-of-order arrival, and partial failures.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription projection and status vocabulary
//! - `stripe_event` - Event envelope and the closed event type vocabulary
//! - `stripe_objects` - Wire shapes for subscription and invoice payloads
//! - `webhook_verifier` - HMAC-SHA256 signature verification
//! - `webhook_errors` - Retryable vs. non-retryable error taxonomy
//! - `handlers` - Pure per-event-type handlers
//! - `webhook_processor` - Idempotency guard, dispatch, and audit log
//! - `notification` - User-facing notification drafts

mod handlers;
mod notification;
mod stripe_event;
mod stripe_objects;
mod subscription;
mod webhook_errors;
mod webhook_processor;
mod webhook_verifier;

pub use handlers::{EventContext, HandlerOutput, SubscriptionChange};
pub use notification::{NotificationDraft, NotificationKind};
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use stripe_objects::{InvoiceObject, SubscriptionObject};
pub use subscription::{Subscription, SubscriptionPatch, SubscriptionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_processor::{ProcessOutcome, WebhookProcessor};
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier};

#[cfg(test)]
pub use webhook_verifier::compute_test_signature;
