//! Tracing initialisation for the ppsweep binaries.
//!
//! Without `RUST_LOG`, ppsweep's own crates log at the requested level and
//! everything else at `warn`, so engine output is not buried under
//! dependency noise. All log lines go to stderr; stdout carries dry-run
//! commands and rendered task files.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const CRATES: [&str; 3] = ["ppsweep", "ppsweep_core", "ppsweep_exec"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}

/// Install the global subscriber; later calls are no-ops.
///
/// With `json`, each event is one JSON line with its fields (`base`,
/// `command`, `exit_code`, ...) at the top level.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = if json {
        registry
            .with(layer.json().flatten_event(true).with_current_span(false))
            .try_init()
    } else {
        registry.with(layer).try_init()
    };
}
