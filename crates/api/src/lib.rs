//! # Telecare API
//!
//! The API crate provides the web server for the Telecare appointment
//! scheduling service: doctor availability, slot listing and validation,
//! reservations and the appointment lifecycle.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Extract request data and shape responses
//! - **Services**: Booking coordination, lifecycle transitions, notifications
//! - **Middleware**: Actor identification and error mapping
//! - **Config**: Environment and booking policy configuration
//!
//! Storage is reached only through the `BookingStore` trait from
//! `telecare-db`, so the server runs unchanged against Postgres or the
//! in-memory store.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Actor extraction and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;
/// Scheduling services shared by handlers and binaries
pub mod services;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use eyre::Result;
use telecare_core::scheduling::BookingPolicy;
use telecare_db::BookingStore;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::{
    middleware::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
    services::{
        notifier::{LogNotifier, Notifier},
        payment::{LoggingPaymentGateway, PaymentGateway},
    },
};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub store: Arc<dyn BookingStore>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentGateway>,
    pub policy: BookingPolicy,
}

impl ApiState {
    /// State with log-only notification and payment collaborators.
    pub fn new(store: Arc<dyn BookingStore>, policy: BookingPolicy) -> Self {
        Self {
            store,
            notifier: Arc::new(LogNotifier),
            payments: Arc::new(LoggingPaymentGateway),
            policy,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }
}

/// Installs the global `tracing` subscriber.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Builds the application router with all routes attached to `state`.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Doctor availability and slot endpoints
        .merge(routes::availability::routes())
        // Reservation and lifecycle endpoints
        .merge(routes::appointment::routes())
        // Attach shared state to all routes
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ])
        .allow_origin(origins)
        .allow_credentials(true)
}

/// Starts the API server with the provided configuration and store
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn run() -> eyre::Result<()> {
/// let config = telecare_api::config::ApiConfig::from_env()?;
/// let store = Arc::new(telecare_db::MemoryStore::new());
/// telecare_api::start_server(config, store).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(config: config::ApiConfig, store: Arc<dyn BookingStore>) -> Result<()> {
    // Initialize tracing for logging
    init_tracing(config.log_level)?;

    let state = Arc::new(ApiState::new(store, config.policy));
    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    // Request spans and timeout
    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout))),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "Server listening on http://{} (store: {:?}, slot length: {} min)",
        addr, config.store_backend, config.policy.slot_minutes
    );
    axum::serve(listener, app).await?;

    Ok(())
}
