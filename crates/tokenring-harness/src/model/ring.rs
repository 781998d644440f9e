//! Model ring - the reference implementation.

use std::collections::BTreeSet;

use tokenring_core::{AckPolicy, Phase, Variant};

use super::operation::{Operation, OperationError, OperationResult};

/// Observable state for oracle comparison.
///
/// This is the subset of ring state that can be compared against the real
/// coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Current round.
    pub round: u64,
    /// Token holder.
    pub holder: u32,
    /// Current phase.
    pub phase: Phase,
    /// Critical section occupant.
    pub occupant: Option<u32>,
    /// Whether the ring was stopped.
    pub stopped: bool,
    /// Nodes that acknowledged the latest broadcast, ascending.
    pub acknowledged: Vec<u32>,
    /// Acknowledgments reported so far.
    pub acks_reported: usize,
    /// Missing acknowledgments reported so far.
    pub missing_reported: usize,
}

/// Model ring.
#[derive(Debug, Clone)]
pub struct ModelRing {
    size: u32,
    variant: Variant,
    holder: u32,
    round: u64,
    phase: Phase,
    occupant: Option<u32>,
    stopped: bool,
    /// Round and holder of the latest broadcast.
    broadcast: Option<(u64, u32)>,
    expected: BTreeSet<u32>,
    acknowledged: BTreeSet<u32>,
    acks_reported: usize,
    missing_reported: usize,
}

impl ModelRing {
    /// Ring of nodes `0..size` with node 0 holding the token.
    pub fn new(size: u32, variant: Variant) -> Self {
        Self {
            size,
            variant,
            holder: 0,
            round: 0,
            phase: Phase::Idle,
            occupant: None,
            stopped: false,
            broadcast: None,
            expected: BTreeSet::new(),
            acknowledged: BTreeSet::new(),
            acks_reported: 0,
            missing_reported: 0,
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real coordinator's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        if self.stopped {
            return OperationResult::Ok;
        }

        match *op {
            Operation::Advance { enter } => self.advance(enter),
            Operation::CompleteDwell => self.complete_dwell(),
            Operation::DeliverAck { sender, stale } => self.deliver_ack(sender, stale),
            Operation::AckTimeout { stale } => {
                let round = if stale { self.round.wrapping_sub(1) } else { self.round };
                self.ack_timeout(round)
            },
            Operation::Stop => {
                self.stopped = true;
                OperationResult::Ok
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            round: self.round,
            holder: self.holder,
            phase: self.phase,
            occupant: self.occupant,
            stopped: self.stopped,
            acknowledged: self.acknowledged.iter().copied().collect(),
            acks_reported: self.acks_reported,
            missing_reported: self.missing_reported,
        }
    }

    fn advance(&mut self, enter: bool) -> OperationResult {
        if self.phase != Phase::Idle {
            return violation();
        }

        if enter {
            self.occupant = Some(self.holder);
            self.phase = Phase::InCriticalSection;
        } else {
            self.phase = Phase::Skipping;
        }
        OperationResult::Ok
    }

    fn complete_dwell(&mut self) -> OperationResult {
        if !matches!(self.phase, Phase::InCriticalSection | Phase::Skipping) {
            return violation();
        }
        self.occupant = None;

        match self.variant {
            Variant::Basic => self.hand_over(),
            Variant::Privilege { policy } => {
                self.broadcast = Some((self.round, self.holder));
                self.expected = (0..self.size).filter(|n| *n != self.holder).collect();
                self.acknowledged.clear();

                match policy {
                    AckPolicy::Gate if self.expected.is_empty() => self.hand_over(),
                    AckPolicy::Gate => self.phase = Phase::AwaitingAcks,
                    AckPolicy::FireAndForget => self.hand_over(),
                }
            },
        }
        OperationResult::Ok
    }

    fn deliver_ack(&mut self, sender: u8, stale: bool) -> OperationResult {
        let Variant::Privilege { policy } = self.variant else {
            return violation();
        };

        let sender = u32::from(sender) % (self.size + 1);
        if sender >= self.size {
            return OperationResult::Error(OperationError::InvalidNodeId);
        }

        // Before the first broadcast every acknowledgment is stale.
        if stale || self.broadcast.is_none() {
            return OperationResult::Ok;
        }

        let gated = policy == AckPolicy::Gate;
        if gated && self.phase != Phase::AwaitingAcks {
            return OperationResult::Ok;
        }
        if !self.expected.contains(&sender) || !self.acknowledged.insert(sender) {
            return OperationResult::Ok;
        }
        self.acks_reported += 1;

        if gated && self.acknowledged == self.expected {
            self.hand_over();
        }
        OperationResult::Ok
    }

    fn ack_timeout(&mut self, round: u64) -> OperationResult {
        if self.phase != Phase::AwaitingAcks || round != self.round {
            return OperationResult::Ok;
        }

        self.missing_reported += self.expected.difference(&self.acknowledged).count();
        self.hand_over();
        OperationResult::Ok
    }

    fn hand_over(&mut self) {
        self.holder = (self.holder + 1) % self.size;
        self.round += 1;
        self.phase = Phase::Idle;
    }
}

fn violation() -> OperationResult {
    OperationResult::Error(OperationError::ProtocolViolation)
}
