//! Cooperative shutdown.
//!
//! A [`Shutdown`] is a cloneable one-way stop flag. The Ctrl+C handler sets
//! it; the scheduler polls it while waiting and between runs.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `request()` is safe to call from the signal handler thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative shutdown (idempotent).
    #[inline]
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check whether a shutdown has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Installs a Ctrl+C handler that requests this shutdown.
    ///
    /// Only one handler can be installed per process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            handle.request();
        })
    }
}
