//! Log setup for the `repocheck` binary.
//!
//! `repocheck scan` prints its result table on stdout and `repocheck report`
//! prints the output path there, so every log line goes to stderr. Piping
//! `repocheck scan` into another tool never mixes diagnostics with results.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber. `--json` selects newline-delimited JSON for
/// log shippers; `RUST_LOG` overrides `level` (set by `--verbose`). A second
/// call is a no-op.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let _ = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_noop() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
