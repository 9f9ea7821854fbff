//! SiteSmith backend entry point.
//!
//! Loads configuration, connects PostgreSQL, wires the billing adapters
//! into the router, and serves the API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sitesmith::adapters::http::billing::billing_router;
use sitesmith::adapters::http::BillingAppState;
use sitesmith::adapters::postgres::{
    PostgresCreditLedger, PostgresEventMarkerRepository, PostgresOrderRepository,
};
use sitesmith::config::AppConfig;
use sitesmith::domain::billing::{ClientConfirmationVerifier, Reconciler, WebhookVerifier};
use sitesmith::ports::{CreditLedger, EventMarkerRepository, OrderRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let orders: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let ledger: Arc<dyn CreditLedger> = Arc::new(PostgresCreditLedger::new(pool.clone()));
    let event_markers: Arc<dyn EventMarkerRepository> =
        Arc::new(PostgresEventMarkerRepository::new(pool));

    let secret = config.payment.razorpay_webhook_secret.clone();
    let state = BillingAppState {
        orders: orders.clone(),
        ledger,
        event_markers,
        webhook_verifier: Arc::new(WebhookVerifier::new(secret.clone())),
        confirmation_verifier: Arc::new(ClientConfirmationVerifier::new(secret)),
        reconciler: Arc::new(Reconciler::new(orders, config.payment.website_id.clone())),
    };

    let app = Router::new()
        .nest("/api", billing_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config));

    let addr = config.server.socket_addr()?;
    info!(%addr, website_id = %config.payment.website_id, "starting sitesmith backend");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
