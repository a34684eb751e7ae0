//! Wait-Times Gateway Library
//!
//! Caching HTTP gateway for theme-park ride wait-time APIs.
//!
//! # Features
//!
//! - **TTL Response Cache**: absolute per-entry expiry, lazy expiration on
//!   read, periodic background sweep, observable via a stats call
//! - **Cache-Shielded Proxy**: the upstream feed is hit at most once per TTL
//!   window per dataset, with single-flight deduplication of concurrent misses
//! - **Explicit Lifecycle**: the composition root owns the cache and destroys
//!   it on shutdown signals; no module-level singletons
//! - **Production Ready**: structured logging, graceful shutdown, health check

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod upstream;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
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
