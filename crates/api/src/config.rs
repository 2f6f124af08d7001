//! # API Configuration Module
//!
//! This module handles loading and managing configuration for the Telecare API server.
//! It retrieves configuration values from environment variables and provides defaults
//! where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `STORE_BACKEND`: `postgres` or `memory` (default: `postgres`)
//! - `DATABASE_URL`: PostgreSQL connection string (required for the postgres backend)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `SLOT_GRANULARITY_MINUTES`: Length of one bookable slot, at most a day (default: 30)
//! - `BOOKING_LEAD_MINUTES`: Minimum notice for a same-day booking, at most a week (default: 60)
//! - `CANCELLATION_CUTOFF_HOURS`: Cancellation closes this long before the slot, at most a year (default: 24)
//! - `PENDING_EXPIRY_HOURS`: Unanswered requests expire after this long, at most a year (default: 24)

use eyre::{eyre, Result, WrapErr};
use std::{env, str::FromStr};
use telecare_core::scheduling::BookingPolicy;
use tracing::Level;

const MAX_SLOT_MINUTES: i64 = 24 * 60;
const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;
const MAX_WINDOW_HOURS: i64 = 365 * 24;

/// Where appointments and availability templates are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local state, lost on restart. Meant for demos and tests.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(eyre!("Unknown STORE_BACKEND value: {}", other)),
        }
    }
}

/// Configuration for the Telecare API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use telecare_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}:{}", config.host, config.port);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    pub store_backend: StoreBackend,

    /// PostgreSQL database connection string
    pub database_url: Option<String>,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Slot length, lead time, cancellation cutoff and expiry window
    pub policy: BookingPolicy,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The postgres backend is selected and DATABASE_URL is not set
    /// - A numeric value cannot be parsed
    /// - STORE_BACKEND names an unknown backend
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // Network settings
        let host = var("API_HOST", "0.0.0.0");
        let port = var("API_PORT", "3000")
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Storage settings
        let store_backend: StoreBackend = var("STORE_BACKEND", "postgres").parse()?;
        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(eyre!("DATABASE_URL environment variable must be set"));
        }

        // Logging settings
        let log_level = match var("LOG_LEVEL", "info").to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Performance settings
        let request_timeout = var("API_REQUEST_TIMEOUT_SECONDS", "30")
            .parse()
            .wrap_err("Invalid API_REQUEST_TIMEOUT_SECONDS value")?;

        // Booking rules
        let defaults = BookingPolicy::default();
        let bounded = |key: &str, default: i64, max: i64| -> Result<i64> {
            let value: i64 = match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .wrap_err_with(|| format!("Invalid {} value", key))?,
                None => default,
            };
            if !(1..=max).contains(&value) {
                return Err(eyre!("{} must be between 1 and {}, got {}", key, max, value));
            }
            Ok(value)
        };
        let policy = BookingPolicy {
            slot_minutes: bounded(
                "SLOT_GRANULARITY_MINUTES",
                defaults.slot_minutes,
                MAX_SLOT_MINUTES,
            )?,
            lead_minutes: bounded("BOOKING_LEAD_MINUTES", defaults.lead_minutes, MAX_LEAD_MINUTES)?,
            cancellation_cutoff_hours: bounded(
                "CANCELLATION_CUTOFF_HOURS",
                defaults.cancellation_cutoff_hours,
                MAX_WINDOW_HOURS,
            )?,
            pending_expiry_hours: bounded(
                "PENDING_EXPIRY_HOURS",
                defaults.pending_expiry_hours,
                MAX_WINDOW_HOURS,
            )?,
        };

        Ok(Self {
            host,
            port,
            store_backend,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            policy,
        })
    }

    /// Returns the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
