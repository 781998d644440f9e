//! Broadcast and acknowledgment messages of the privilege-based variant.
//!
//! Messages are ephemeral: they exist to drive sink notifications and, for
//! acknowledgments, to fill the [`AckLedger`] that gates token advancement.

use std::collections::BTreeSet;

use crate::node::NodeId;

/// Kind of a simulated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Holder to every other node.
    Broadcast,
    /// Recipient of a broadcast back to the holder.
    Acknowledgment,
}

/// A simulated message between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    /// Node that sent the message
    pub sender: NodeId,
    /// Node the message is addressed to
    pub recipient: NodeId,
    /// Broadcast or acknowledgment
    pub kind: MessageKind,
    /// Round the message belongs to
    pub round: u64,
}

impl Message {
    /// Broadcast from `holder` to `recipient`.
    pub fn broadcast(holder: NodeId, recipient: NodeId, round: u64) -> Self {
        Self { sender: holder, recipient, kind: MessageKind::Broadcast, round }
    }

    /// Acknowledgment from `sender` back to `holder`.
    pub fn acknowledgment(sender: NodeId, holder: NodeId, round: u64) -> Self {
        Self { sender, recipient: holder, kind: MessageKind::Acknowledgment, round }
    }

    /// Display label: `m{sender}{recipient}` for broadcasts and
    /// `r{sender}{recipient}` for acknowledgments.
    pub fn label(&self) -> String {
        let prefix = match self.kind {
            MessageKind::Broadcast => 'm',
            MessageKind::Acknowledgment => 'r',
        };
        format!("{prefix}{}{}", self.sender, self.recipient)
    }
}

/// Acknowledgments collected for the current broadcast round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckLedger {
    round: Option<u64>,
    holder: Option<NodeId>,
    expected: BTreeSet<NodeId>,
    acknowledged: BTreeSet<NodeId>,
}

impl AckLedger {
    /// Start a new round; forgets everything recorded for the previous one.
    pub fn reset(&mut self, round: u64, holder: NodeId, expected: impl IntoIterator<Item = NodeId>) {
        self.round = Some(round);
        self.holder = Some(holder);
        self.expected = expected.into_iter().collect();
        self.acknowledged.clear();
    }

    /// Round being collected, if any broadcast happened yet.
    pub fn round(&self) -> Option<u64> {
        self.round
    }

    /// Holder that broadcast in the current round.
    pub fn holder(&self) -> Option<NodeId> {
        self.holder
    }

    /// Record an acknowledgment from `sender`.
    ///
    /// Returns true only the first time an expected sender acknowledges.
    pub fn record(&mut self, sender: NodeId) -> bool {
        self.expected.contains(&sender) && self.acknowledged.insert(sender)
    }

    /// Whether every expected node has acknowledged.
    pub fn is_complete(&self) -> bool {
        self.acknowledged.len() == self.expected.len()
    }

    /// Nodes that acknowledged, in id order.
    pub fn acknowledged(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.acknowledged.iter().copied()
    }

    /// Expected nodes that have not acknowledged, in id order.
    pub fn missing(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.expected.difference(&self.acknowledged).copied()
    }
}
