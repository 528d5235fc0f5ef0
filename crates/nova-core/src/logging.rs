//! Ambient logging setup.
//!
//! Reads `NOVA_LOG_LEVEL` (`DEBUG|INFO|WARNING|ERROR|CRITICAL`, default
//! `INFO`) and `NOVA_LOG_FORMAT` (`compact|full|json`, default `compact`,
//! unrecognized values fall back to `compact`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn level_filter() -> String {
    let level = std::env::var("NOVA_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" => "error",
        "CRITICAL" => "error",
        _ => "info",
    }
    .to_string()
}

/// Initialise the global `tracing` subscriber from the process environment.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter()));
    let format = std::env::var("NOVA_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let recognized = matches!(format.as_str(), "compact" | "full" | "json");
    let registry = tracing_subscriber::registry().with(filter);
    let _ = match format.as_str() {
        "full" => registry.with(fmt::layer()).try_init(),
        "json" => registry.with(fmt::layer().json()).try_init(),
        _ => registry.with(fmt::layer().compact()).try_init(),
    };
    if !recognized {
        tracing::warn!(format, "unrecognized NOVA_LOG_FORMAT, falling back to compact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_nova_levels_onto_tracing_levels() {
        std::env::set_var("NOVA_LOG_LEVEL", "CRITICAL");
        assert_eq!(level_filter(), "error");
        std::env::set_var("NOVA_LOG_LEVEL", "warning");
        assert_eq!(level_filter(), "warn");
        std::env::remove_var("NOVA_LOG_LEVEL");
        assert_eq!(level_filter(), "info");
    }
}
