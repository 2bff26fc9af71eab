//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Webhook verification and subscription reconciliation

pub mod billing;
pub mod foundation;
