//! Tracing subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber. `RUST_LOG` wins over `level` when set.
/// Calling this twice is harmless; the second call leaves the first subscriber in place.
pub fn init(level: &str, json: bool) {
    let directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("asset_registry={level},sea_orm=warn,sqlx=warn"));

    let builder = fmt().with_env_filter(EnvFilter::new(directive));
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
