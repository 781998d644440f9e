//! Ring configuration.

use std::time::Duration;

use crate::{error::RingError, topology::RingTopology};

/// Largest ring accepted by the basic variant.
pub const MAX_RING_SIZE: usize = 64;

/// Largest ring accepted by the privilege-based variant.
pub const MAX_PRIVILEGE_RING_SIZE: usize = 10;

/// How acknowledgments relate to token advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckPolicy {
    /// Hold the token until every node acknowledged or the timeout elapsed.
    #[default]
    Gate,

    /// Schedule acknowledgments but hand the token over immediately.
    /// Late acknowledgments are still reported; missing ones never are.
    FireAndForget,
}

/// Protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Decide, optionally use the critical section, pass the token.
    #[default]
    Basic,

    /// Additionally broadcast to every other node and collect
    /// acknowledgments before passing the token.
    Privilege {
        /// Acknowledgment gating policy
        policy: AckPolicy,
    },
}

impl Variant {
    /// Largest ring size this variant accepts.
    pub fn max_ring_size(self) -> usize {
        match self {
            Self::Basic => MAX_RING_SIZE,
            Self::Privilege { .. } => MAX_PRIVILEGE_RING_SIZE,
        }
    }
}

/// Protocol durations.
///
/// All durations may be zero, which makes a simulated run advance without
/// any waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time a node spends in the critical section. A skipping node idles for
    /// the same duration so both branches share one cadence.
    pub dwell: Duration,
    /// Pause after handover before the next round may start
    pub inter_round_delay: Duration,
    /// Delay before a recipient's acknowledgment is delivered
    pub ack_delay: Duration,
    /// Longest wait for acknowledgments before advancing anyway
    pub ack_timeout: Duration,
}

impl Timing {
    /// Zero durations everywhere.
    pub fn instant() -> Self {
        Self {
            dwell: Duration::ZERO,
            inter_round_delay: Duration::ZERO,
            ack_delay: Duration::ZERO,
            ack_timeout: Duration::ZERO,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            dwell: Duration::from_secs(1),
            inter_round_delay: Duration::from_secs(1),
            ack_delay: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(3),
        }
    }
}

/// Ring configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of nodes
    pub size: usize,
    /// Protocol variant
    pub variant: Variant,
    /// Protocol durations
    pub timing: Timing,
}

impl RingConfig {
    /// Basic ring of `size` nodes with default timing.
    pub fn basic(size: usize) -> Self {
        Self { size, variant: Variant::Basic, timing: Timing::default() }
    }

    /// Privilege-based ring of `size` nodes with default timing.
    pub fn privilege(size: usize, policy: AckPolicy) -> Self {
        Self { size, variant: Variant::Privilege { policy }, timing: Timing::default() }
    }

    /// Replace the timing.
    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Check the ring size against the variant's bound and build the
    /// topology.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` if the size is zero or too large.
    pub fn topology(&self) -> Result<RingTopology, RingError> {
        RingTopology::new(self.size, self.variant.max_ring_size())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::basic(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_variant_is_bounded_to_ten() {
        assert!(RingConfig::privilege(10, AckPolicy::Gate).topology().is_ok());
        assert_eq!(
            RingConfig::privilege(11, AckPolicy::Gate).topology(),
            Err(RingError::InvalidSize { size: 11, max: MAX_PRIVILEGE_RING_SIZE })
        );
    }

    #[test]
    fn basic_variant_allows_larger_rings() {
        assert!(RingConfig::basic(11).topology().is_ok());
        assert!(RingConfig::basic(0).topology().is_err());
    }

    #[test]
    fn default_timing_waits_longer_for_acks_than_it_delays_them() {
        let timing = Timing::default();
        assert!(timing.ack_timeout > timing.ack_delay);
    }
}
