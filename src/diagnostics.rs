//! Quiet-suppressible error reporting.
//!
//! Failure paths in the registry never abort: they log and fall through to
//! the next strategy. Applications that render untrusted documents in bulk
//! usually want those messages silenced, so every report goes through a
//! shared [`Diagnostics`] that checks the `err_quiet` setting first.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared reporter for recoverable errors.
#[derive(Debug, Default)]
pub struct Diagnostics {
    quiet: AtomicBool,
}

impl Diagnostics {
    /// Create a reporter with the given quiet flag.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet: AtomicBool::new(quiet),
        }
    }

    /// Suppress (or re-enable) error messages.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    /// Whether error messages are currently suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    /// Report a recoverable error.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        if !self.is_quiet() {
            log::warn!("{}", args);
        }
    }
}
