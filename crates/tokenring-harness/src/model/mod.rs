//! Reference model for model-based testing.
//!
//! The model is a deliberately naive ring: plain integers for node ids, a
//! set for the outstanding acknowledgments, no sink and no actions. It serves
//! as the oracle against which the real coordinator is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Behaviour not mechanism: captures WHAT the ring does, not HOW
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod ring;

pub use operation::{Operation, OperationError, OperationResult};
pub use ring::{ModelRing, ObservableState};
