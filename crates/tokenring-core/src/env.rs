//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples the driving loop from system resources
//! (time, randomness). This enables:
//!
//! - Deterministic Simulation: Turmoil provides a virtual clock and a seeded
//!   RNG, so a whole ring run with dwell and acknowledgment timers finishes
//!   instantly and reproduces exactly.
//!
//! - Production Runtime: Tokio and the OS entropy pool drive the same ring
//!   without any change to the protocol logic.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time, randomness, and async sleeping.
///
/// The coordinator itself never touches the environment. It hands back
/// [`RingAction`](crate::RingAction)s and the driver uses the environment to
/// honour them.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: Subsequent calls must return times >= previous calls.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (dwell, inter-round delay, acknowledgment timers).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Determinism during simulations: Given the same RNG seed, this produces
    ///   the same sequence of bytes
    /// - Production implementations draw from the OS entropy pool
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a fair random boolean.
    ///
    /// Used by [`EnvDecision`](crate::decision::EnvDecision) to flip the
    /// enter/skip coin for a token holder.
    fn random_bool(&self) -> bool {
        let mut byte = [0u8; 1];
        self.random_bytes(&mut byte);
        byte[0] & 1 == 1
    }
}
