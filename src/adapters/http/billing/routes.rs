//! Axum router configuration for billing webhook endpoints.
//!
//! This module defines the route structure for the webhook API and wires
//! it to the corresponding handlers.

use axum::{routing::post, Router};

use super::handlers::{handle_stripe_webhook, BillingAppState};

/// Create the Stripe webhook router.
///
/// Webhook routes carry no user authentication; every request is verified
/// via the Stripe-Signature header instead.
///
/// # Routes
/// - `POST /stripe` - Handle Stripe webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing module router.
///
/// Suitable for mounting at `/api`:
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new().nest("/webhooks", webhook_routes())
}
