use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const ENV_LOG_FORMAT: &str = "EXAMPLES_LOG_FORMAT";
const DEFAULT_FILTER: &str = "warn";

/// Install the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG` (default `warn`). Output goes to stderr so
/// stdout carries only command output; `EXAMPLES_LOG_FORMAT=json` switches to
/// one JSON object per event.
pub fn init() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = env::var(ENV_LOG_FORMAT).unwrap_or_default();

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.context("installing tracing subscriber")
}
