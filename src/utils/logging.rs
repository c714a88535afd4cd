//! Logging macros gated on the runtime debug flag from the settings.
//!
//! Usage:
//! ```rust,ignore
//! use crate::{log_debug, log_warn, log_error};
//!
//! log_debug!("modal {} already focused, skipping", id);
//! ```
//!
//! `log_debug!` is the chatty channel: with debug mode on it is promoted to
//! `info` so it shows under the default filter, otherwise it stays at `debug`
//! and only appears with `RUST_LOG=debug`.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Prefix carried by every promoted debug line.
pub const LOG_PREFIX: &str = "[Reminder Focus]";

/// Mirror the settings' debug flag. Called on load and after every save.
pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn debug_mode() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

/// Initialize the `env_logger` backend (reads RUST_LOG). Safe to call more than
/// once; later calls are ignored.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Debug logging that follows the settings' debug flag.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::utils::logging::debug_mode() {
            log::info!("{} {}", $crate::utils::logging::LOG_PREFIX, format_args!($($arg)*));
        } else {
            log::debug!($($arg)*);
        }
    };
}

/// Warn logging with the crate prefix.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!("{} {}", $crate::utils::logging::LOG_PREFIX, format_args!($($arg)*));
    };
}

/// Error logging with the crate prefix.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!("{} {}", $crate::utils::logging::LOG_PREFIX, format_args!($($arg)*));
    };
}
