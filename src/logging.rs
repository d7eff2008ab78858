//! Log subscriber setup for the daemon binary.
//!
//! The library only talks to the `log` facade.  The binary installs a
//! `tracing-subscriber` formatter whose `tracing-log` bridge picks those
//! records up.  Verbosity comes from `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const DEFAULT_FILTER: &str = "info";

/// Filter from `RUST_LOG`, or [`DEFAULT_FILTER`] when unset or unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.  Fails if one is already set.
pub fn init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
}
