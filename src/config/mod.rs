//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables via the
//! `config` and `dotenvy` crates. Variables carry the `CRAWLREADY` prefix
//! and nest with double underscores, so `CRAWLREADY__SERVER__PORT` lands
//! in `server.port`.
//!
//! # Example
//!
//! ```no_run
//! use crawlready_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Listening on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root configuration for the billing webhook service
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe webhook secret)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file is read first when present so development setups do
    /// not have to export variables by hand. Only `database.url` and
    /// `payment.stripe_webhook_secret` are required; everything else has
    /// a default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is absent or a value
    /// does not parse into its typed field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CRAWLREADY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Run semantic validation across every section.
    ///
    /// Deserialization only guarantees types; this checks the values:
    /// URL schemes, pool bounds, the webhook secret prefix.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
