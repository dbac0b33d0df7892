//! Logger setup for the command-line application

use env_logger::Env;
use log::LevelFilter;

/// Initialize the logger with the given [LevelFilter]
///
/// Only messages from this crate are shown. `RUST_LOG` can still be used to
/// enable output from other crates.
pub fn initialize_logger(filter: LevelFilter) {
    env_logger::Builder::from_env(Env::default().default_filter_or("off"))
        .filter_module(env!("CARGO_CRATE_NAME"), filter)
        .format_target(false)
        .init();
}
