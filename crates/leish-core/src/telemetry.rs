//! Log routing for the `leishmaniapp` binary.
//!
//! Commands print their results (the reconcile report, case summaries) on
//! stdout so they can be piped; every log line goes to stderr. With `--json`
//! the reconcile events from [`crate::obs`] and the [`crate::metrics`] flush
//! come out as one JSON object per line, ready for a log shipper.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber.
///
/// `RUST_LOG` wins over `level` when set, so a single run can be narrowed
/// with e.g. `RUST_LOG=leish_core::reconciler=debug`. A subscriber that is
/// already installed (a second call, or a test harness) is left in place.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr)
            .try_init()
            .ok();
    }
}
