//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with an explicit default level
///
/// `RUST_LOG` still overrides per-module filters. Returns `false` if a logger
/// was already installed.
pub fn init_with_level(level: LevelFilter) -> bool {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init()
        .is_ok()
}

/// Install a test-friendly logger; repeated calls are harmless
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
