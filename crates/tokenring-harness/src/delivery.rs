//! Fault-injecting acknowledgment delivery.
//!
//! Turmoil's `fail_rate` only applies to simulated network links. Ring
//! acknowledgments never touch a link, so loss and latency are injected at the
//! driver's delivery hook instead, drawing from the simulation's seeded RNG.

use std::{collections::BTreeSet, time::Duration};

use tokenring_core::{Message, NodeId, env::Environment};
use tokenring_runtime::AckDelivery;

use crate::SimEnv;

/// Drops a fraction of acknowledgments and delays the rest by a random
/// amount on top of the requested delay.
#[derive(Clone)]
pub struct LossyAcks {
    env: SimEnv,
    loss_rate: f64,
    max_jitter: Duration,
}

impl LossyAcks {
    /// Drop each acknowledgment with probability `loss_rate` (clamped to
    /// `0.0..=1.0`).
    pub fn new(env: SimEnv, loss_rate: f64) -> Self {
        Self { env, loss_rate: loss_rate.clamp(0.0, 1.0), max_jitter: Duration::ZERO }
    }

    /// Add up to `max_jitter` (millisecond resolution) to every delivered
    /// acknowledgment.
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Uniform draw in `[0, 1)` from the top 53 bits of a `u64`.
    #[allow(clippy::cast_precision_loss)]
    fn roll(&self) -> f64 {
        (self.env.random_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl AckDelivery for LossyAcks {
    fn delay(&self, _ack: &Message, requested: Duration) -> Option<Duration> {
        if self.roll() < self.loss_rate {
            return None;
        }

        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = match jitter_ms {
            0 => 0,
            max => self.env.random_u64() % (max + 1),
        };
        Some(requested + Duration::from_millis(extra))
    }
}

/// Drops every acknowledgment sent by the given nodes.
#[derive(Debug, Clone, Default)]
pub struct SilentNodes {
    silent: BTreeSet<NodeId>,
}

impl SilentNodes {
    /// Silence `nodes`.
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self { silent: nodes.into_iter().collect() }
    }
}

impl AckDelivery for SilentNodes {
    fn delay(&self, ack: &Message, requested: Duration) -> Option<Duration> {
        (!self.silent.contains(&ack.sender)).then_some(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(sender: u32) -> Message {
        Message::acknowledgment(NodeId(sender), NodeId(0), 0)
    }

    #[test]
    fn zero_loss_delivers_everything_on_time() {
        let lossy = LossyAcks::new(SimEnv::with_seed(1), 0.0);
        for sender in 1..50 {
            assert_eq!(lossy.delay(&ack(sender), Duration::from_secs(1)), Some(Duration::from_secs(1)));
        }
    }

    #[test]
    fn total_loss_drops_everything() {
        let lossy = LossyAcks::new(SimEnv::with_seed(1), 1.0);
        assert!((1..50).all(|sender| lossy.delay(&ack(sender), Duration::ZERO).is_none()));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let lossy =
            LossyAcks::new(SimEnv::with_seed(9), 0.0).with_jitter(Duration::from_millis(300));
        for sender in 1..200 {
            let delay = lossy.delay(&ack(sender), Duration::from_secs(1)).unwrap();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1300));
        }
    }

    #[test]
    fn same_seed_same_losses() {
        let pattern = |seed| {
            let lossy = LossyAcks::new(SimEnv::with_seed(seed), 0.5);
            (1..64).map(|sender| lossy.delay(&ack(sender), Duration::ZERO).is_some()).collect::<Vec<_>>()
        };

        assert_eq!(pattern(42), pattern(42));
    }

    #[test]
    fn silent_nodes_only_drop_their_own() {
        let policy = SilentNodes::new([NodeId(2)]);
        assert_eq!(policy.delay(&ack(1), Duration::ZERO), Some(Duration::ZERO));
        assert_eq!(policy.delay(&ack(2), Duration::ZERO), None);
    }
}
