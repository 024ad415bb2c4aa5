//! Logger setup for binaries and tests that embed the harness.
//!
//! The library itself only emits records through the `log` facade: fold
//! boundaries at `info`, split sizes at `debug`, per-instance prediction
//! failures at `trace`.
use log::LevelFilter;

/// Environment variable consulted for the filter directives.
pub const LOG_ENV: &str = "REDEEM_VALIDATION_LOG";

/// Install an `env_logger` backend.
///
/// `default_filter` is used when `REDEEM_VALIDATION_LOG` is not set, e.g.
/// `"error,redeem_validation=info"`. Returns `false` if a logger was already
/// installed, which is not treated as an error.
pub fn init_logging(default_filter: &str) -> bool {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, default_filter))
        .try_init()
        .is_ok()
}
