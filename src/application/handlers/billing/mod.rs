//! Billing handlers.
//!
//! Command handlers for the inbound webhook boundary. Verification,
//! environment guards, and outcome mapping live here; reconciliation
//! semantics live in the domain processor.

mod process_stripe_webhook;

pub use process_stripe_webhook::{
    ProcessStripeWebhookCommand, ProcessStripeWebhookHandler, ProcessStripeWebhookResult,
};
