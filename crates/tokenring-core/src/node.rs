//! Node identifiers and per-node protocol state.

use std::fmt;

/// Identifier of a node in the ring, in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index of this node into per-node tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// State of a single node.
///
/// Created when the ring is initialised and mutated only by the
/// [`TokenCoordinator`](crate::TokenCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    holds_token: bool,
    last_decision: Option<bool>,
    in_critical_section: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, holds_token: bool) -> Self {
        Self { id, holds_token, last_decision: None, in_critical_section: false }
    }

    /// Node identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether this node currently holds the token.
    pub fn holds_token(&self) -> bool {
        self.holds_token
    }

    /// Decision taken the last time this node held the token.
    ///
    /// `None` until the node has been asked at least once.
    pub fn last_decision(&self) -> Option<bool> {
        self.last_decision
    }

    /// Whether this node is inside the critical section.
    pub fn in_critical_section(&self) -> bool {
        self.in_critical_section
    }

    pub(crate) fn set_holds_token(&mut self, holds: bool) {
        self.holds_token = holds;
    }

    pub(crate) fn record_decision(&mut self, entered: bool) {
        self.last_decision = Some(entered);
    }

    pub(crate) fn set_in_critical_section(&mut self, inside: bool) {
        self.in_critical_section = inside;
    }
}

/// Occupancy of the shared critical section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CriticalSection {
    occupant: Option<NodeId>,
}

impl CriticalSection {
    /// Node currently inside, if any.
    pub fn occupant(&self) -> Option<NodeId> {
        self.occupant
    }

    /// Whether the critical section is free.
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    pub(crate) fn enter(&mut self, node: NodeId) {
        debug_assert!(self.occupant.is_none(), "critical section already occupied");
        self.occupant = Some(node);
    }

    pub(crate) fn leave(&mut self) -> Option<NodeId> {
        self.occupant.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_no_decision() {
        let node = Node::new(NodeId(3), false);
        assert_eq!(node.id(), NodeId(3));
        assert!(!node.holds_token());
        assert_eq!(node.last_decision(), None);
        assert!(!node.in_critical_section());
    }

    #[test]
    fn critical_section_enter_and_leave() {
        let mut cs = CriticalSection::default();
        assert!(cs.is_free());

        cs.enter(NodeId(1));
        assert_eq!(cs.occupant(), Some(NodeId(1)));

        assert_eq!(cs.leave(), Some(NodeId(1)));
        assert!(cs.is_free());
        assert_eq!(cs.leave(), None);
    }
}
