//! Tracing setup.
//!
//! Logs go to stderr so stdout stays clean for JSON tool responses, matching
//! the teacher's `logging.rs`. Verbosity is controlled by
//! `CODEBASE_CONTEXT_DEBUG` or `Settings::debug`.

use tracing_subscriber::{EnvFilter, fmt};

pub fn init_logging(debug: bool) {
    let default_directive = if debug || std::env::var("CODEBASE_CONTEXT_DEBUG").is_ok() {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
