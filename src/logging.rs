//! Tracing setup: env-filter with per-environment defaults, JSON output in
//! production and human-readable output everywhere else.

use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "lilyseo_backend=debug,tower_http=debug,info",
        Environment::Staging => "lilyseo_backend=debug,tower_http=info,info",
        Environment::Prod => "lilyseo_backend=info,tower_http=info,warn",
    }
}

/// Initialize the global subscriber. `RUST_LOG` overrides the defaults.
pub fn init_logging(env: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(env).into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    let registry = tracing_subscriber::registry().with(filter);
    if env.is_prod() {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer.pretty()).init();
    }

    tracing::info!(env = ?env, "Logging initialized");
}
