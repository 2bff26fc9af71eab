//! Crawlready Billing - Stripe webhook reconciliation service
//!
//! This crate keeps local subscription state consistent with Stripe by
//! consuming webhook events: each delivery is signature-verified, processed
//! exactly once, and recorded in an append-only processing ledger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
