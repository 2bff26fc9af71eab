//! Configuration error types.
//!
//! Loading and validation fail separately: `ConfigError` covers the
//! environment-to-struct step, `ValidationError` the semantic checks that
//! run after deserialization succeeded.

use thiserror::Error;

/// Errors raised while loading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Semantic validation failures for individual settings
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required setting: {0}")]
    MissingRequired(&'static str),

    #[error("Server port must be non-zero")]
    PortOutOfRange,

    #[error("Request timeout must be between 1 and 300 seconds")]
    TimeoutOutOfRange,

    #[error("Database URL must use a postgres:// or postgresql:// scheme")]
    DatabaseUrlScheme,

    #[error("Pool min_connections exceeds max_connections")]
    PoolBoundsInverted,

    #[error("Pool max_connections exceeds the allowed ceiling (100)")]
    PoolTooLarge,

    #[error("Stripe webhook secret must start with whsec_")]
    WebhookSecretFormat,
}
