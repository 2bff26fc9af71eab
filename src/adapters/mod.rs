//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST endpoints for webhook ingestion
//! - `postgres` - PostgreSQL-backed repository implementations

pub mod http;
pub mod postgres;
