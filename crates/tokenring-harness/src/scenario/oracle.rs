//! Oracle functions for scenario verification.
//!
//! Oracles run after the simulation and check global properties of the
//! recorded event stream.

use tokenring_core::{AckPolicy, NodeId, RingEvent, Variant};

use crate::scenario::World;

/// Oracle function type.
///
/// Receives the finished world and returns:
/// - `Ok(())` if all invariants hold
/// - `Err(message)` if verification fails
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;

/// The token visits nodes in ring order starting at node 0.
pub fn ring_order() -> OracleFn {
    Box::new(|world| {
        let size = world.config().size;
        for (i, holder) in world.holders().into_iter().enumerate() {
            let expected = NodeId(u32::try_from(i % size).map_err(|e| e.to_string())?);
            if holder != expected {
                return Err(format!("holder #{i} was {holder}, expected {expected}"));
            }
        }
        Ok(())
    })
}

/// Critical section entries and exits strictly alternate, only the current
/// holder enters, and only holders that decided to enter do.
pub fn mutual_exclusion() -> OracleFn {
    Box::new(|world| {
        let mut holder = None;
        let mut decided = None;
        let mut occupant: Option<NodeId> = None;

        for event in world.events() {
            match event {
                RingEvent::TokenHeld(node) => {
                    holder = Some(*node);
                    decided = None;
                },
                RingEvent::Decision { node, entered } => {
                    if Some(*node) != holder {
                        return Err(format!("node {node} decided without the token"));
                    }
                    decided = Some(*entered);
                },
                RingEvent::Enter(node) => {
                    if let Some(inside) = occupant {
                        return Err(format!("node {node} entered while {inside} was inside"));
                    }
                    if Some(*node) != holder || decided != Some(true) {
                        return Err(format!("node {node} entered without deciding to"));
                    }
                    occupant = Some(*node);
                },
                RingEvent::Exit(node) => {
                    if occupant != Some(*node) {
                        return Err(format!("node {node} left a section it did not occupy"));
                    }
                    occupant = None;
                },
                RingEvent::RoundComplete(summary) => {
                    if occupant.is_some() {
                        return Err(format!("round {} ended with an occupant", summary.round));
                    }
                },
                _ => {},
            }
        }
        Ok(())
    })
}

/// In a gated privilege ring every completed round accounts for each other
/// node exactly once, as an acknowledgment or as missing.
pub fn acknowledgments_accounted() -> OracleFn {
    Box::new(|world| {
        if world.config().variant != (Variant::Privilege { policy: AckPolicy::Gate }) {
            return Ok(());
        }

        let expected = world.config().size - 1;
        for summary in world.rounds() {
            if summary.broadcasts.len() != expected {
                return Err(format!(
                    "round {} broadcast {} messages, expected {expected}",
                    summary.round,
                    summary.broadcasts.len()
                ));
            }
            let accounted = summary.acknowledgments.len() + summary.missing.len();
            if accounted != expected {
                return Err(format!(
                    "round {} accounted for {accounted} nodes, expected {expected}",
                    summary.round
                ));
            }
        }
        Ok(())
    })
}

/// Exactly `rounds` rounds completed.
pub fn completed_rounds(rounds: u64) -> OracleFn {
    Box::new(move |world| {
        let completed = world.report().rounds;
        if completed == rounds {
            Ok(())
        } else {
            Err(format!("{completed} rounds completed, expected {rounds}"))
        }
    })
}

/// Combine multiple oracles into one.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world| {
        for oracle in oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
