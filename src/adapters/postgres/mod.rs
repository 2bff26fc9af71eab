//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresSubscriptionRepository` - Subscription rows keyed by provider id
//! - `PostgresUserDirectory` - Read-only user account lookups
//! - `PostgresNotificationRepository` - User-facing notification inserts
//! - `PostgresWebhookEventRepository` - Append-only webhook processing ledger

mod notification_repository;
mod subscription_repository;
mod user_directory;
mod webhook_event_repository;

pub use notification_repository::PostgresNotificationRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use user_directory::PostgresUserDirectory;
pub use webhook_event_repository::PostgresWebhookEventRepository;
