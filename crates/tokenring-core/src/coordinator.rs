//! Token coordinator state machine.
//!
//! The coordinator owns the token, the per-node state, the critical section,
//! and (privilege-based variant) the acknowledgment ledger. It is the only
//! code that mutates any of them.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods take `&mut self` and never sleep, spawn, or read the clock
//! - Methods return `Result<Vec<RingAction>, RingError>`
//! - The driver executes the actions (wait, schedule an acknowledgment, wait
//!   for acknowledgments with a timeout) and feeds the outcome back
//!
//! Because every transition happens inside one `&mut self` call, no observer
//! can see the token in flight: handover clears the old holder and marks the
//! successor before the call returns.
//!
//! # Round
//!
//! ```text
//!            advance()                 complete_dwell()
//! ┌──────┐ ───────────> ┌──────────┐ ─────────────────────┐
//! │ Idle │              │ Deciding │                      │
//! └──────┘              └──────────┘                      │
//!    ↑                    │       │                       │
//!    │        enter ──────┘       └────── skip            │
//!    │          ↓                          ↓              │
//!    │ ┌───────────────────┐         ┌──────────┐         │
//!    │ │ InCriticalSection │         │ Skipping │ ────────┤
//!    │ └───────────────────┘         └──────────┘         │
//!    │                   basic ┌───────────┐ privilege    ↓
//!    └──────────────────────── │ Advancing │ <── ┌──────────────┐
//!                              └───────────┘     │ Broadcasting │
//!                                    ↑           └──────────────┘
//!                                    │ all acks / timeout   │
//!                              ┌──────────────┐             │
//!                              │ AwaitingAcks │ <───────────┘
//!                              └──────────────┘
//! ```
//!
//! `Deciding`, `Broadcasting`, and `Advancing` are transient: they are entered
//! and left within a single call.

use std::time::Duration;

use crate::{
    config::{AckPolicy, RingConfig, Variant},
    decision::DecisionSource,
    error::{MissingAcknowledgment, RingError},
    message::{AckLedger, Message, MessageKind},
    node::{CriticalSection, Node, NodeId},
    sink::{EventSink, RoundSummary},
    topology::RingTopology,
};

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for [`TokenCoordinator::advance`]
    Idle,
    /// Asking the holder for its decision
    Deciding,
    /// Holder is inside the critical section
    InCriticalSection,
    /// Holder declined; idling for the dwell duration
    Skipping,
    /// Holder is broadcasting to every other node
    Broadcasting,
    /// Waiting for acknowledgments or the timeout
    AwaitingAcks,
    /// Handing the token to the successor
    Advancing,
}

/// Actions returned by the coordinator for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingAction {
    /// Suspend the driving loop for this long.
    Wait(Duration),

    /// Deliver `ack` back through [`TokenCoordinator::record_ack`] after
    /// `after`.
    ScheduleAck {
        /// Acknowledgment to deliver
        ack: Message,
        /// Delivery delay
        after: Duration,
    },

    /// Wait for acknowledgments of `round`; call
    /// [`TokenCoordinator::ack_timeout`] if `timeout` elapses first.
    AwaitAcks {
        /// Round whose acknowledgments are awaited
        round: u64,
        /// Longest wait
        timeout: Duration,
    },
}

/// Observable coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingSnapshot {
    /// Current round
    pub round: u64,
    /// Node holding the token
    pub holder: NodeId,
    /// Current phase
    pub phase: Phase,
    /// Critical section occupant
    pub occupant: Option<NodeId>,
    /// Every node whose `holds_token` flag is set
    pub holders: Vec<NodeId>,
    /// Whether the coordinator has been stopped
    pub stopped: bool,
}

/// Per-round bookkeeping for the [`RoundSummary`].
#[derive(Debug, Clone, Default)]
struct RoundRecord {
    entered: bool,
    broadcasts: Vec<String>,
    acknowledgments: Vec<String>,
    missing: Vec<NodeId>,
}

/// Token coordinator.
///
/// Generic over the sink it reports to and the source of enter/skip
/// decisions, both injected at construction.
#[derive(Debug)]
pub struct TokenCoordinator<S, D> {
    config: RingConfig,
    topology: RingTopology,
    /// Indexed by `NodeId`
    nodes: Vec<Node>,
    holder: NodeId,
    phase: Phase,
    round: u64,
    critical_section: CriticalSection,
    ledger: AckLedger,
    record: RoundRecord,
    stopped: bool,
    sink: S,
    decision: D,
}

impl<S, D> TokenCoordinator<S, D>
where
    S: EventSink,
    D: DecisionSource,
{
    /// Create a coordinator for the ring `0..config.size`. Node 0 starts with
    /// the token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` if the size is out of range for the variant.
    pub fn new(config: RingConfig, sink: S, decision: D) -> Result<Self, RingError> {
        let topology = config.topology()?;
        Self::with_topology(config, topology, sink, decision)
    }

    /// Create a coordinator with an explicit ring order. The first node of
    /// `topology` starts with the token; `config.size` is replaced by the
    /// topology's length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` if the topology is too large for the variant.
    pub fn with_topology(
        mut config: RingConfig,
        topology: RingTopology,
        sink: S,
        decision: D,
    ) -> Result<Self, RingError> {
        let max = config.variant.max_ring_size();
        if topology.len() > max {
            return Err(RingError::InvalidSize { size: topology.len(), max });
        }
        config.size = topology.len();

        let holder = topology.first();
        let nodes = (0..topology.len())
            .map(|i| {
                let id = NodeId(i as u32);
                Node::new(id, id == holder)
            })
            .collect();

        tracing::debug!(size = topology.len(), variant = ?config.variant, "ring initialised");

        Ok(Self {
            config,
            topology,
            nodes,
            holder,
            phase: Phase::Idle,
            round: 0,
            critical_section: CriticalSection::default(),
            ledger: AckLedger::default(),
            record: RoundRecord::default(),
            stopped: false,
            sink,
            decision,
        })
    }

    /// Start a round: the holder decides and, if it wants to, enters the
    /// critical section.
    ///
    /// Returns `Wait(dwell)` in both branches so that every round has the
    /// same cadence.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` unless the coordinator is `Idle`.
    pub fn advance(&mut self) -> Result<Vec<RingAction>, RingError> {
        if self.stopped {
            return Ok(Vec::new());
        }
        if self.phase != Phase::Idle {
            return Err(self.violation("advance"));
        }

        let holder = self.holder;
        tracing::debug!(round = self.round, %holder, "token held");
        self.sink.on_token_held(holder);

        self.phase = Phase::Deciding;
        let entered = self.decision.decide(holder);
        self.node_mut(holder).record_decision(entered);
        self.sink.on_decision(holder, entered);
        self.record = RoundRecord { entered, ..RoundRecord::default() };

        if entered {
            self.critical_section.enter(holder);
            self.node_mut(holder).set_in_critical_section(true);
            self.phase = Phase::InCriticalSection;
            tracing::debug!(round = self.round, %holder, "entered critical section");
            self.sink.on_critical_section_enter(holder);
        } else {
            self.phase = Phase::Skipping;
            tracing::debug!(round = self.round, %holder, "skipped critical section");
        }

        Ok(vec![RingAction::Wait(self.config.timing.dwell)])
    }

    /// End the dwell: leave the critical section if occupied, then hand the
    /// token over (basic) or broadcast (privilege-based).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolViolation` unless the coordinator is
    /// `InCriticalSection` or `Skipping`.
    pub fn complete_dwell(&mut self) -> Result<Vec<RingAction>, RingError> {
        if self.stopped {
            return Ok(Vec::new());
        }

        match self.phase {
            Phase::InCriticalSection => {
                let holder = self.holder;
                self.critical_section.leave();
                self.node_mut(holder).set_in_critical_section(false);
                tracing::debug!(round = self.round, %holder, "left critical section");
                self.sink.on_critical_section_exit(holder);
            },
            Phase::Skipping => {},
            _ => return Err(self.violation("complete dwell")),
        }

        match self.config.variant {
            Variant::Basic => self.hand_over(),
            Variant::Privilege { policy } => self.broadcast(policy),
        }
    }

    /// Deliver an acknowledgment.
    ///
    /// Acknowledgments for an earlier round, duplicates, and (gated policy)
    /// acknowledgments arriving after the timeout are ignored. The last
    /// missing acknowledgment of a gated round hands the token over.
    ///
    /// # Errors
    ///
    /// - `ProtocolViolation` for a broadcast message, in the basic variant,
    ///   or for an acknowledgment of the current round addressed to a node
    ///   that is not its holder
    /// - `InvalidNodeId` if either end is not in the ring
    pub fn record_ack(&mut self, ack: Message) -> Result<Vec<RingAction>, RingError> {
        if self.stopped {
            return Ok(Vec::new());
        }

        let Variant::Privilege { policy } = self.config.variant else {
            return Err(self.violation("record acknowledgment"));
        };
        if ack.kind != MessageKind::Acknowledgment {
            return Err(self.violation("record broadcast as acknowledgment"));
        }
        for id in [ack.sender, ack.recipient] {
            if !self.topology.contains(id) {
                return Err(RingError::InvalidNodeId { id, size: self.topology.len() });
            }
        }

        if self.ledger.round() != Some(ack.round) {
            tracing::debug!(round = ack.round, sender = %ack.sender, "ignoring stale acknowledgment");
            return Ok(Vec::new());
        }
        if self.ledger.holder() != Some(ack.recipient) {
            return Err(self.violation("record acknowledgment for another holder"));
        }

        let gated = policy == AckPolicy::Gate;
        if gated && self.phase != Phase::AwaitingAcks {
            tracing::debug!(round = ack.round, sender = %ack.sender, "acknowledgment after timeout");
            return Ok(Vec::new());
        }
        if !self.ledger.record(ack.sender) {
            return Ok(Vec::new());
        }

        let label = ack.label();
        tracing::debug!(round = ack.round, sender = %ack.sender, %label, "acknowledged");
        self.sink.on_acknowledgment(ack.recipient, ack.sender, &label);

        if gated {
            self.record.acknowledgments.push(label);
            if self.ledger.is_complete() {
                return self.hand_over();
            }
        }

        Ok(Vec::new())
    }

    /// The acknowledgment wait for `round` elapsed.
    ///
    /// Reports each node that stayed silent exactly once, then hands the
    /// token over. A timeout for a round that already advanced is ignored.
    pub fn ack_timeout(&mut self, round: u64) -> Result<Vec<RingAction>, RingError> {
        if self.stopped || self.phase != Phase::AwaitingAcks || round != self.round {
            return Ok(Vec::new());
        }

        let holder = self.holder;
        let silent: Vec<NodeId> = self.ledger.missing().collect();
        let mut missing = self.topology.others(holder)?;
        missing.retain(|node| silent.contains(node));

        for node in &missing {
            let condition = MissingAcknowledgment { node: *node, round };
            tracing::warn!(%condition, "missing acknowledgment");
            self.sink.on_missing_acknowledgment(*node, round);
        }
        self.record.missing = missing;

        self.hand_over()
    }

    /// Stop the coordinator. Idempotent.
    ///
    /// Every later operation returns no actions and changes nothing, so
    /// timers still in flight fire harmlessly.
    pub fn stop(&mut self) {
        if !self.stopped {
            tracing::debug!(round = self.round, holder = %self.holder, "coordinator stopped");
        }
        self.stopped = true;
    }

    /// Node holding the token.
    pub fn holder(&self) -> NodeId {
        self.holder
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round (0 for the first round).
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Per-node state, indexed by `NodeId`.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// State of one node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Critical section occupancy.
    pub fn critical_section(&self) -> CriticalSection {
        self.critical_section
    }

    /// Acknowledgment ledger of the latest broadcast.
    pub fn ledger(&self) -> &AckLedger {
        &self.ledger
    }

    /// Ring order.
    pub fn topology(&self) -> &RingTopology {
        &self.topology
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// The injected sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Observable state.
    pub fn snapshot(&self) -> RingSnapshot {
        RingSnapshot {
            round: self.round,
            holder: self.holder,
            phase: self.phase,
            occupant: self.critical_section.occupant(),
            holders: self.nodes.iter().filter(|n| n.holds_token()).map(Node::id).collect(),
            stopped: self.stopped,
        }
    }

    fn broadcast(&mut self, policy: AckPolicy) -> Result<Vec<RingAction>, RingError> {
        self.phase = Phase::Broadcasting;

        let holder = self.holder;
        let round = self.round;
        let recipients = self.topology.others(holder)?;
        self.ledger.reset(round, holder, recipients.iter().copied());

        for recipient in &recipients {
            let label = Message::broadcast(holder, *recipient, round).label();
            self.sink.on_broadcast(holder, *recipient, &label);
            self.record.broadcasts.push(label);
        }
        tracing::debug!(round, %holder, recipients = recipients.len(), "broadcast sent");

        let ack_delay = self.config.timing.ack_delay;
        let mut actions: Vec<RingAction> = recipients
            .into_iter()
            .map(|recipient| RingAction::ScheduleAck {
                ack: Message::acknowledgment(recipient, holder, round),
                after: ack_delay,
            })
            .collect();

        match policy {
            AckPolicy::Gate => {
                self.phase = Phase::AwaitingAcks;
                if self.ledger.is_complete() {
                    actions.extend(self.hand_over()?);
                } else {
                    actions.push(RingAction::AwaitAcks {
                        round,
                        timeout: self.config.timing.ack_timeout,
                    });
                }
            },
            AckPolicy::FireAndForget => actions.extend(self.hand_over()?),
        }

        Ok(actions)
    }

    fn hand_over(&mut self) -> Result<Vec<RingAction>, RingError> {
        self.phase = Phase::Advancing;

        let previous = self.holder;
        let next = self.topology.successor(previous)?;
        let record = std::mem::take(&mut self.record);
        let summary = RoundSummary {
            round: self.round,
            holder: previous,
            entered: record.entered,
            broadcasts: record.broadcasts,
            acknowledgments: record.acknowledgments,
            missing: record.missing,
        };

        self.node_mut(previous).set_holds_token(false);
        self.node_mut(next).set_holds_token(true);
        self.holder = next;
        self.round += 1;
        self.phase = Phase::Idle;

        tracing::debug!(round = self.round, from = %previous, to = %next, "token handed over");
        self.sink.on_round_complete(&summary);

        Ok(vec![RingAction::Wait(self.config.timing.inter_round_delay)])
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn violation(&self, operation: &'static str) -> RingError {
        RingError::ProtocolViolation { phase: self.phase, operation }
    }
}
