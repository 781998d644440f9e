//! Error types for the token ring core.
//!
//! Every variant of [`RingError`] is fatal: it either rejects a configuration
//! before a run starts or reveals a bug in the driving loop. The only
//! recoverable condition, a missing acknowledgment, is not an error at all. It
//! is reported through the event sink as a [`MissingAcknowledgment`] and the
//! round proceeds.

use thiserror::Error;

use crate::{coordinator::Phase, node::NodeId};

/// Errors produced by topology construction and coordinator operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// Ring size outside the supported range.
    #[error("invalid ring size {size}: must be between 1 and {max}")]
    InvalidSize {
        /// Requested number of nodes
        size: usize,
        /// Largest size accepted for the chosen variant
        max: usize,
    },

    /// Node identifier is not part of the ring.
    #[error("invalid node id {id}: ring has {size} nodes")]
    InvalidNodeId {
        /// Offending identifier
        id: NodeId,
        /// Number of nodes in the ring
        size: usize,
    },

    /// Coordinator operation invoked in the wrong phase.
    #[error("protocol violation: cannot {operation} in phase {phase:?}")]
    ProtocolViolation {
        /// Phase the coordinator was in
        phase: Phase,
        /// Operation that was attempted
        operation: &'static str,
    },
}

impl RingError {
    /// Returns true if the error must terminate the run.
    ///
    /// All `RingError`s are fatal; the method exists so callers can be
    /// explicit at the boundary where they decide to abort.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidSize { .. } | Self::InvalidNodeId { .. } | Self::ProtocolViolation { .. } => {
                true
            },
        }
    }
}

/// Non-fatal condition: a node did not acknowledge a broadcast in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingAcknowledgment {
    /// Node whose acknowledgment never arrived
    pub node: NodeId,
    /// Round of the broadcast
    pub round: u64,
}

impl std::fmt::Display for MissingAcknowledgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {} did not acknowledge round {}", self.node, self.round)
    }
}
