//! Tracing subscriber setup.
//!
//! `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "daily_problems=debug,tower_http=debug";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
  let registry = tracing_subscriber::registry().with(filter);

  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    _ => registry.with(tracing_subscriber::fmt::layer()).init(),
  }
}
