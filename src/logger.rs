//! Terminal logging with colored module prefixes.
//!
//! Build output goes through the [`log!`] macro, warnings through [`warn!`],
//! and verbose-only diagnostics through [`debug!`]. Warnings never fail a
//! build; fatal problems are reported through the error types instead.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

/// Global verbose flag (set by the `--verbose` CLI argument).
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally.
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check whether verbose mode is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("build"; "compiling {} posts", count);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a non-fatal warning to stderr.
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::warn($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when `--verbose` is enabled).
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

#[inline]
pub fn log(module: &str, message: &str) {
    println!("{} {}", format!("[{}]", module).green().bold(), message);
}

#[inline]
pub fn warn(module: &str, message: &str) {
    eprintln!("{} {}", format!("[{}]", module).yellow().bold(), message);
}

#[inline]
pub fn error(module: &str, message: &str) {
    eprintln!("{} {}", format!("[{}]", module).red().bold(), message);
}
