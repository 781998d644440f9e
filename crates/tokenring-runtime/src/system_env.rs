//! Environment backed by the tokio clock and the OS entropy pool.

use std::time::{Duration, Instant};

use tokenring_core::env::Environment;

/// Production environment for the driving loop.
///
/// Time comes from the tokio clock rather than `std::time`, so `now()` and
/// `sleep()` agree even when a test pauses and advances the runtime clock.
/// The enter/skip coin draws from `getrandom`.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            // Zeroes bias every coin towards skipping; the ring still turns.
            tracing::error!(len = buffer.len(), "entropy unavailable: {}", e);
            buffer.fill(0);
        }
    }
}
