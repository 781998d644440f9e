//! Token ring mutual exclusion core logic
//!
//! This crate contains the pure state machine for a ring of nodes that
//! circulate a single token. Only the token holder may decide to enter the
//! shared critical section. The privilege-based variant additionally has the
//! holder broadcast to every other node and collect acknowledgments before
//! the token moves on.
//!
//! # Architecture: "The Hollow Shell"
//!
//! Protocol logic is strictly separated from timers and threads:
//!
//! ```text
//!      ┌────────────────────────────┐
//!      │ tokenring-core             │
//!      │ - Topology, nodes          │
//!      │ - Coordinator state machine│
//!      │ - Ack ledger, event sink   │
//!      └────────────────────────────┘
//!         ↓                      ↓
//! ┌──────────────────┐  ┌───────────────────┐
//! │ tokenring-harness│  │ tokenring-runtime │
//! │ (Turmoil)        │  │ (Tokio)           │
//! │ - Virtual time   │  │ - System clock    │
//! │ - Seeded RNG     │  │ - OS randomness   │
//! │ - Lossy acks     │  │ - CLI             │
//! └──────────────────┘  └───────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in Core: the coordinator never sleeps, spawns, or reads the clock
//! - Actions: every operation returns [`RingAction`]s for the driver
//! - Single owner: exactly one node holds the token at every observable
//!   instant, and at most one node occupies the critical section
//!
//! # Modules
//!
//! - [`coordinator`]: Token coordinator (basic and privilege-based variants)
//! - [`topology`]: Ring order and successor function
//! - [`node`]: Node identifiers, node state, critical section
//! - [`message`]: Broadcast/acknowledgment messages and the ack ledger
//! - [`decision`]: Pluggable enter/skip decision sources
//! - [`sink`]: Event sink interface and recorders
//! - [`config`]: Ring size, variant, timing
//! - [`env`]: Environment abstraction (time, RNG)
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod decision;
pub mod env;
pub mod error;
pub mod message;
pub mod node;
pub mod sink;
pub mod topology;

pub use config::{AckPolicy, RingConfig, Timing, Variant};
pub use coordinator::{Phase, RingAction, RingSnapshot, TokenCoordinator};
pub use decision::DecisionSource;
pub use error::{MissingAcknowledgment, RingError};
pub use message::{AckLedger, Message, MessageKind};
pub use node::{CriticalSection, Node, NodeId};
pub use sink::{EventLog, EventSink, NullSink, RingEvent, RoundSummary};
pub use topology::RingTopology;
