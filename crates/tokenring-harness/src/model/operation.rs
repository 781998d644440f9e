//! Operations for model-based testing.
//!
//! Operations represent every call a driver can make on the coordinator,
//! including out-of-order and stale ones. They are generated randomly by
//! proptest (or the fuzzer) and applied to both the model and the real
//! coordinator.

use arbitrary::Arbitrary;

/// Operations that can be applied to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Start a round; the holder decides `enter`.
    Advance {
        /// Decision handed to the holder
        enter: bool,
    },

    /// End the dwell.
    CompleteDwell,

    /// Deliver an acknowledgment to the holder of the latest broadcast.
    ///
    /// `sender` is taken modulo `size + 1`, so `size` itself names a node
    /// outside the ring.
    DeliverAck {
        /// Acknowledging node
        sender: u8,
        /// Address the round before the latest broadcast
        stale: bool,
    },

    /// Fire the acknowledgment timeout for the current round, or for the
    /// previous round when `stale`.
    AckTimeout {
        /// Fire for the previous round
        stale: bool,
    },

    /// Stop the ring.
    Stop,
}

/// Result of applying an operation.
///
/// Used to compare model and real coordinator behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok,

    /// Operation failed with an expected error.
    Error(OperationError),
}

/// Errors an operation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Operation not allowed in the current phase or variant.
    ProtocolViolation,

    /// Node id outside the ring.
    InvalidNodeId,
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
