//! Event sink the coordinator reports protocol events to.
//!
//! Sinks are observers only. They receive `&self`, cannot reach back into the
//! coordinator, and are called synchronously in the order events happen.
//! Rendering layers, loggers, and test recorders all implement [`EventSink`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::node::NodeId;

/// Record of a completed round, produced at token handover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// Round number (0 for the first round)
    pub round: u64,
    /// Node that held the token
    pub holder: NodeId,
    /// Whether the holder entered the critical section
    pub entered: bool,
    /// Broadcast labels, in send order
    pub broadcasts: Vec<String>,
    /// Acknowledgment labels recorded before handover, in arrival order
    pub acknowledgments: Vec<String>,
    /// Nodes that failed to acknowledge before the timeout
    pub missing: Vec<NodeId>,
}

/// Observer of protocol events. Every method defaults to a no-op.
pub trait EventSink {
    /// `node` received the token.
    fn on_token_held(&self, _node: NodeId) {}

    /// `node` decided whether to enter the critical section.
    fn on_decision(&self, _node: NodeId, _entered: bool) {}

    /// `node` entered the critical section.
    fn on_critical_section_enter(&self, _node: NodeId) {}

    /// `node` left the critical section.
    fn on_critical_section_exit(&self, _node: NodeId) {}

    /// Holder `sender` broadcast to `recipient`.
    fn on_broadcast(&self, _sender: NodeId, _recipient: NodeId, _label: &str) {}

    /// Holder `recipient` received an acknowledgment from `sender`.
    fn on_acknowledgment(&self, _recipient: NodeId, _sender: NodeId, _label: &str) {}

    /// `node` did not acknowledge the broadcast of `round` in time.
    fn on_missing_acknowledgment(&self, _node: NodeId, _round: u64) {}

    /// A round ended with token handover.
    fn on_round_complete(&self, _summary: &RoundSummary) {}
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn on_token_held(&self, node: NodeId) {
        (**self).on_token_held(node);
    }

    fn on_decision(&self, node: NodeId, entered: bool) {
        (**self).on_decision(node, entered);
    }

    fn on_critical_section_enter(&self, node: NodeId) {
        (**self).on_critical_section_enter(node);
    }

    fn on_critical_section_exit(&self, node: NodeId) {
        (**self).on_critical_section_exit(node);
    }

    fn on_broadcast(&self, sender: NodeId, recipient: NodeId, label: &str) {
        (**self).on_broadcast(sender, recipient, label);
    }

    fn on_acknowledgment(&self, recipient: NodeId, sender: NodeId, label: &str) {
        (**self).on_acknowledgment(recipient, sender, label);
    }

    fn on_missing_acknowledgment(&self, node: NodeId, round: u64) {
        (**self).on_missing_acknowledgment(node, round);
    }

    fn on_round_complete(&self, summary: &RoundSummary) {
        (**self).on_round_complete(summary);
    }
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {}

/// Protocol event as seen by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingEvent {
    /// See [`EventSink::on_token_held`]
    TokenHeld(NodeId),
    /// See [`EventSink::on_decision`]
    Decision {
        /// Deciding holder
        node: NodeId,
        /// Whether it entered
        entered: bool,
    },
    /// See [`EventSink::on_critical_section_enter`]
    Enter(NodeId),
    /// See [`EventSink::on_critical_section_exit`]
    Exit(NodeId),
    /// See [`EventSink::on_broadcast`]
    Broadcast {
        /// Holder
        sender: NodeId,
        /// Addressee
        recipient: NodeId,
        /// Display label
        label: String,
    },
    /// See [`EventSink::on_acknowledgment`]
    Acknowledgment {
        /// Holder receiving the acknowledgment
        recipient: NodeId,
        /// Acknowledging node
        sender: NodeId,
        /// Display label
        label: String,
    },
    /// See [`EventSink::on_missing_acknowledgment`]
    MissingAcknowledgment {
        /// Silent node
        node: NodeId,
        /// Round of the broadcast
        round: u64,
    },
    /// See [`EventSink::on_round_complete`]
    RoundComplete(RoundSummary),
}

/// Sink that records every event in order.
///
/// Share it through an `Arc` to keep a handle while the coordinator owns
/// another.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RingEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<RingEvent> {
        self.lock().clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Holders in the order they received the token.
    pub fn holders(&self) -> Vec<NodeId> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RingEvent::TokenHeld(node) => Some(*node),
                _ => None,
            })
            .collect()
    }

    /// Decisions in the order they were taken.
    pub fn decisions(&self) -> Vec<bool> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RingEvent::Decision { entered, .. } => Some(*entered),
                _ => None,
            })
            .collect()
    }

    /// Completed round summaries.
    pub fn rounds(&self) -> Vec<RoundSummary> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RingEvent::RoundComplete(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&RingEvent) -> bool) -> usize {
        self.lock().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: RingEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RingEvent>> {
        // A poisoned log only means a test panicked mid-push; the data is
        // still a valid prefix of the event stream.
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventSink for EventLog {
    fn on_token_held(&self, node: NodeId) {
        self.push(RingEvent::TokenHeld(node));
    }

    fn on_decision(&self, node: NodeId, entered: bool) {
        self.push(RingEvent::Decision { node, entered });
    }

    fn on_critical_section_enter(&self, node: NodeId) {
        self.push(RingEvent::Enter(node));
    }

    fn on_critical_section_exit(&self, node: NodeId) {
        self.push(RingEvent::Exit(node));
    }

    fn on_broadcast(&self, sender: NodeId, recipient: NodeId, label: &str) {
        self.push(RingEvent::Broadcast { sender, recipient, label: label.to_owned() });
    }

    fn on_acknowledgment(&self, recipient: NodeId, sender: NodeId, label: &str) {
        self.push(RingEvent::Acknowledgment { recipient, sender, label: label.to_owned() });
    }

    fn on_missing_acknowledgment(&self, node: NodeId, round: u64) {
        self.push(RingEvent::MissingAcknowledgment { node, round });
    }

    fn on_round_complete(&self, summary: &RoundSummary) {
        self.push(RingEvent::RoundComplete(summary.clone()));
    }
}
