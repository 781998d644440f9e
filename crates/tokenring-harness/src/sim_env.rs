//! Turmoil-based Environment implementation for deterministic testing.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokenring_core::env::Environment;

/// Simulation environment using Turmoil's virtual time and seeded RNG.
///
/// This implementation provides:
///
/// - **Virtual Time**: `now()` and `sleep()` use the tokio clock that Turmoil
///   drives, so dwell, inter-round and acknowledgment timers of a long run
///   complete instantly.
///
/// - **Seeded RNG**: `random_bytes()` uses `ChaCha20Rng` seeded with a fixed
///   value, so enter/skip coins and lossy delivery reproduce exactly.
///
/// # Usage
///
/// Time operations must run inside a Turmoil simulation (or a tokio runtime
/// with a paused clock). The RNG works anywhere.
#[derive(Clone)]
pub struct SimEnv {
    /// Shared across clones so every component draws from one sequence.
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Create a new `SimEnv` with default seed (0).
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a new `SimEnv` with a specific seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, dest: &mut [u8]) {
        // Turmoil is single threaded; a poisoned lock still holds a valid RNG.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(dest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_env_time_advances() {
        let mut sim = turmoil::Builder::new().build();

        sim.client("test", async {
            let env = SimEnv::new();

            let start = env.now();
            env.sleep(Duration::from_secs(5)).await;
            let end = env.now();

            assert_eq!(end - start, Duration::from_secs(5));

            Ok(())
        });

        sim.run().unwrap();
    }

    #[test]
    fn sim_env_rng_is_deterministic() {
        let run = |seed: u64| -> Vec<u8> {
            let env = SimEnv::with_seed(seed);
            let mut bytes = vec![0u8; 64];
            env.random_bytes(&mut bytes);
            bytes
        };

        assert_eq!(run(12345), run(12345));
        assert_ne!(run(12345), run(54321));
    }

    #[test]
    fn sim_env_clones_share_rng_state() {
        let env1 = SimEnv::with_seed(999);
        let env2 = env1.clone();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];

        env1.random_bytes(&mut bytes1);
        env2.random_bytes(&mut bytes2);

        // One sequence, so the second draw differs from the first
        assert_ne!(bytes1, bytes2);
    }

    #[test]
    fn seeded_coins_repeat() {
        let flips = |seed| {
            let env = SimEnv::with_seed(seed);
            (0..32).map(|_| env.random_bool()).collect::<Vec<_>>()
        };

        assert_eq!(flips(7), flips(7));
    }
}
