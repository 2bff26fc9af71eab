//! Crawlready Billing service entrypoint.
//!
//! Wires configuration, the PostgreSQL pool, and the webhook processing
//! stack into an Axum server. The webhook endpoint is the only write
//! surface; everything else in this binary is composition.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crawlready_billing::adapters::http::{billing_router, BillingAppState};
use crawlready_billing::adapters::postgres::{
    PostgresNotificationRepository, PostgresSubscriptionRepository, PostgresUserDirectory,
    PostgresWebhookEventRepository,
};
use crawlready_billing::config::AppConfig;
use crawlready_billing::domain::billing::{StripeWebhookVerifier, WebhookProcessor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_logging(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "PostgreSQL connection pool established"
    );

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations completed");
    }

    let verifier = Arc::new(StripeWebhookVerifier::new(SecretString::new(
        config.payment.stripe_webhook_secret.clone(),
    )));
    let processor = Arc::new(WebhookProcessor::new(
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool.clone())),
        Arc::new(PostgresNotificationRepository::new(pool.clone())),
        Arc::new(PostgresWebhookEventRepository::new(pool)),
    ));

    let state = BillingAppState {
        verifier,
        processor,
        require_livemode: config.payment.require_livemode,
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", billing_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Billing webhook service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Structured JSON logs in production, human-readable output everywhere
/// else. `RUST_LOG` overrides the configured filter when set.
fn init_logging(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolves when the process receives ctrl-c or SIGTERM. In-flight webhook
/// requests drain before the listener closes; Stripe redelivers anything
/// cut off mid-request.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "ctrl-c", "Shutting down"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Shutting down"),
    }
}
