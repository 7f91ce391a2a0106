//! Actions Gateway
//!
//! A scope-gated HTTP service that authenticates callers against a
//! third-party identity provider, authorizes them by scope, and serves a
//! permission-filtered aggregation of the upstream "clients" and "actions"
//! collections.
//!
//! # Pipeline
//!
//! request → token validation → scope authorization → client-credentials
//! exchange → concurrent collection fetches → aggregation → JSON response.
//!
//! Any stage failure short-circuits the rest and is rendered by the terminal
//! error handler in [`error`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mgmt;
pub mod view;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// # Errors
///
/// Currently infallible; kept fallible for interface stability.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
