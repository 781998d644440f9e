//! Fixed ring ordering of node identifiers.
//!
//! The topology is immutable after construction and closed under
//! [`RingTopology::successor`]: every successor of a member is itself a
//! member, so the coordinator can never walk off the ring.

use crate::{error::RingError, node::NodeId};

/// Ordered ring of `N >= 1` nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingTopology {
    /// Ring order; `order[i + 1]` follows `order[i]`
    order: Vec<NodeId>,
    /// Inverse of `order`, indexed by `NodeId`
    positions: Vec<usize>,
}

impl RingTopology {
    /// Build the ring `0, 1, ..., size - 1`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` if `size` is zero or exceeds `max`.
    pub fn new(size: usize, max: usize) -> Result<Self, RingError> {
        if size == 0 || size > max {
            return Err(RingError::InvalidSize { size, max });
        }
        let order = (0..size).map(|i| NodeId(i as u32)).collect();
        Ok(Self { order, positions: (0..size).collect() })
    }

    /// Build a ring with an explicit visiting order.
    ///
    /// `order` must be a permutation of `0..order.len()`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` for an empty or oversized order and
    /// `InvalidNodeId` for an identifier out of range or listed twice.
    pub fn from_order(order: Vec<NodeId>, max: usize) -> Result<Self, RingError> {
        let size = order.len();
        if size == 0 || size > max {
            return Err(RingError::InvalidSize { size, max });
        }

        let mut positions = vec![usize::MAX; size];
        for (position, id) in order.iter().enumerate() {
            match positions.get_mut(id.index()) {
                Some(slot) if *slot == usize::MAX => *slot = position,
                _ => return Err(RingError::InvalidNodeId { id: *id, size }),
            }
        }

        Ok(Self { order, positions })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false; a ring has at least one node.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// First node in ring order. It holds the token when a run starts.
    pub fn first(&self) -> NodeId {
        self.order[0]
    }

    /// Whether `id` is a member of the ring.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.positions.len()
    }

    /// Position of `id` in ring order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNodeId` if `id` is not in the ring.
    pub fn position(&self, id: NodeId) -> Result<usize, RingError> {
        self.positions
            .get(id.index())
            .copied()
            .ok_or(RingError::InvalidNodeId { id, size: self.len() })
    }

    /// Node that receives the token after `id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNodeId` if `id` is not in the ring.
    pub fn successor(&self, id: NodeId) -> Result<NodeId, RingError> {
        let position = self.position(id)?;
        Ok(self.order[(position + 1) % self.len()])
    }

    /// Every node except `id`, in ring order starting at its successor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNodeId` if `id` is not in the ring.
    pub fn others(&self, id: NodeId) -> Result<Vec<NodeId>, RingError> {
        let position = self.position(id)?;
        let size = self.len();
        Ok((1..size).map(|offset| self.order[(position + offset) % size]).collect())
    }

    /// Nodes in ring order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }
}
