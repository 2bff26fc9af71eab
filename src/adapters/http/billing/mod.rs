//! HTTP adapter for billing webhook endpoints.
//!
//! Exposes webhook processing via REST API:
//! - `POST /api/webhooks/stripe` - Handle Stripe webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, webhook_routes};
