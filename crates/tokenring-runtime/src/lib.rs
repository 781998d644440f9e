//! Token ring production runtime.
//!
//! This crate drives the sans-IO coordinator from `tokenring-core` using:
//! - Tokio for timers, the acknowledgment channel, and the stop signal
//! - System time and OS randomness
//! - `tracing` for protocol events
//!
//! ## Architecture
//!
//! ```text
//! tokenring-runtime
//!   ├─ SystemEnv     (production Environment impl)
//!   ├─ Driver        (single driving loop, owns the coordinator)
//!   ├─ AckDelivery   (when scheduled acknowledgments arrive)
//!   ├─ StopHandle    (watch-backed stop signal)
//!   └─ TracingSink   (EventSink that logs)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod delivery;
mod driver;
mod error;
mod system_env;
mod tracing_sink;

pub use delivery::{AckDelivery, FixedDelay, OnTime};
pub use driver::{Driver, RunReport, StopHandle, StopReason};
pub use error::RuntimeError;
pub use system_env::SystemEnv;
pub use tracing_sink::TracingSink;
