//! Tracing subscriber setup for the service and the CLI.

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::{LogFormat, LogSettings};

/// Env var holding a full filter directive; wins over `log.level`.
pub const LOG_ENV: &str = "GATECFG_LOG";

/// Install the global subscriber. Later calls leave the first one in place.
pub fn init_logging(settings: &LogSettings) {
    let filter = build_env_filter(settings);
    let base = Registry::default().with(filter);

    let result = match settings.format {
        LogFormat::Json => base
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => base
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

fn build_env_filter(settings: &LogSettings) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"))
}
