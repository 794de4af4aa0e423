use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wire up tracing for the CLI.
///
/// `verbose` turns on debug output for the router's own modules while
/// leaving dependencies at info. `SOR_LOG` (falling back to `RUST_LOG`)
/// overrides the filter entirely, e.g. `SOR_LOG=sor::quoter=trace` to
/// watch the quote batches. `SOR_LOG_FORMAT=json` emits line-delimited
/// JSON for log shippers instead of the human-readable format.
pub fn init_logging(verbose: bool) {
    let _ = dotenv::dotenv();

    let default_filter = if verbose { "info,sor=debug" } else { "info" };
    let filter = env::var("SOR_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_filter.to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if env::var("SOR_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }

    tracing::debug!(log_filter = %filter, "Logging initialized");
}
