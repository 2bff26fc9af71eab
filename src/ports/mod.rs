//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Local projection of provider subscription state
//! - `WebhookEventRepository` - Append-only webhook audit log and idempotency guard
//! - `NotificationRepository` - User-facing notification writes
//!
//! ## Lookup Ports
//!
//! - `UserDirectory` - Resolving webhook events to local users

mod notification_repository;
mod subscription_repository;
mod user_directory;
mod webhook_event_repository;

pub use notification_repository::NotificationRepository;
pub use subscription_repository::SubscriptionRepository;
pub use user_directory::UserDirectory;
pub use webhook_event_repository::{
    SaveResult, SubscriptionEventRecord, WebhookEventRepository,
};
