use std::io;
use std::sync::OnceLock;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Set once from the `--json` CLI flag; controls envelope emission on stdout.
pub fn set_json_mode(v: bool) {
    let _ = JSON_MODE.set(v);
}

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

pub fn logs_are_json() -> bool {
    matches!(std::env::var("SHIURCAST_LOG_FORMAT").as_deref(), Ok("json"))
}

/// Wire up tracing on stderr. `RUST_LOG` picks the filter (default
/// `info`); `SHIURCAST_LOG_FORMAT=json` switches the log lines from
/// compact text to flattened JSON.
pub fn init_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base = fmt::layer().with_target(false).with_writer(io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    if logs_are_json() {
        let _ = registry.with(base.json().flatten_event(true)).try_init();
    } else {
        let _ = registry.with(base.compact()).try_init();
    }
}
