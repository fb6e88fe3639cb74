//! Tracing subscriber setup

use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,sea_orm=warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Compact human-readable lines by default, JSON in production. Calling it
/// again after a subscriber is installed is a no-op.
pub fn init(app: &AppConfig) {
    let registry = tracing_subscriber::registry().with(filter());

    let installed = if app.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .json()
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        tracing::debug!(environment = %app.environment, "logging initialised");
    }
}
