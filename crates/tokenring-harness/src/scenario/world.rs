//! World state captured at the end of a scenario.

use tokenring_core::{NodeId, RingConfig, RingEvent, RoundSummary};
use tokenring_runtime::RunReport;

/// Everything a scenario observed: configuration, the driver's report, and
/// the ordered event stream.
#[derive(Debug, Clone)]
pub struct World {
    config: RingConfig,
    report: RunReport,
    events: Vec<RingEvent>,
}

impl World {
    pub(crate) fn new(config: RingConfig, report: RunReport, events: Vec<RingEvent>) -> Self {
        Self { config, report, events }
    }

    /// Configuration the ring ran with.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// The driver's final report.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Every event in emission order.
    pub fn events(&self) -> &[RingEvent] {
        &self.events
    }

    /// Holders in the order they received the token.
    pub fn holders(&self) -> Vec<NodeId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RingEvent::TokenHeld(node) => Some(*node),
                _ => None,
            })
            .collect()
    }

    /// Completed round summaries.
    pub fn rounds(&self) -> Vec<&RoundSummary> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RingEvent::RoundComplete(summary) => Some(summary),
                _ => None,
            })
            .collect()
    }

    /// Number of acknowledgments reported.
    pub fn acknowledgments(&self) -> usize {
        self.count(|event| matches!(event, RingEvent::Acknowledgment { .. }))
    }

    /// Every `(node, round)` reported as a missing acknowledgment.
    pub fn missing(&self) -> Vec<(NodeId, u64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RingEvent::MissingAcknowledgment { node, round } => Some((*node, *round)),
                _ => None,
            })
            .collect()
    }

    /// Count events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&RingEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}
