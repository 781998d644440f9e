//! Scenario testing framework for deterministic ring simulations.
//!
//! A scenario runs the production [`Driver`](tokenring_runtime::Driver)
//! inside a Turmoil simulation with [`SimEnv`](crate::SimEnv), records every
//! protocol event, and hands the finished [`World`] to a mandatory oracle.

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use oracle::OracleFn;
pub use world::World;
