//! Event sink that turns protocol events into `tracing` events.
//!
//! Round summaries are logged at info level with the holder, the broadcast
//! labels, and the acknowledgment labels of the round, so a plain
//! `RUST_LOG=info` run reads as a table of rounds.

use tokenring_core::{EventSink, NodeId, RoundSummary};

/// Sink that logs every protocol event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_token_held(&self, node: NodeId) {
        tracing::debug!(%node, "token held");
    }

    fn on_decision(&self, node: NodeId, entered: bool) {
        tracing::debug!(%node, entered, "decision");
    }

    fn on_critical_section_enter(&self, node: NodeId) {
        tracing::info!(%node, "entered critical section");
    }

    fn on_critical_section_exit(&self, node: NodeId) {
        tracing::info!(%node, "left critical section");
    }

    fn on_broadcast(&self, sender: NodeId, recipient: NodeId, label: &str) {
        tracing::debug!(%sender, %recipient, label, "broadcast");
    }

    fn on_acknowledgment(&self, recipient: NodeId, sender: NodeId, label: &str) {
        tracing::debug!(%recipient, %sender, label, "acknowledgment");
    }

    fn on_missing_acknowledgment(&self, node: NodeId, round: u64) {
        tracing::warn!(%node, round, "acknowledgment missing");
    }

    fn on_round_complete(&self, summary: &RoundSummary) {
        let missing: Vec<String> = summary.missing.iter().map(ToString::to_string).collect();
        tracing::info!(
            round = summary.round,
            holder = %summary.holder,
            entered = summary.entered,
            messages = %summary.broadcasts.join(", "),
            acknowledgments = %summary.acknowledgments.join(", "),
            missing = %missing.join(", "),
            "round complete"
        );
    }
}
