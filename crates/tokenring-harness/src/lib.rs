//! Deterministic simulation harness for the token ring.
//!
//! Turmoil-based implementation of the Environment trait plus fault-injecting
//! acknowledgment delivery, so whole runs of the production driver (dwell,
//! delays, acknowledgment timeouts) finish instantly and reproduce from a
//! seed.
//!
//! # Scenarios
//!
//! The `scenario` module runs a configured ring to completion and checks the
//! recorded events with oracle functions.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real
//! coordinator, and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delivery;
pub mod model;
pub mod scenario;
pub mod sim_env;

pub use delivery::{LossyAcks, SilentNodes};
pub use model::{ModelRing, ObservableState, Operation, OperationError, OperationResult};
pub use scenario::{Scenario, World};
pub use sim_env::SimEnv;
