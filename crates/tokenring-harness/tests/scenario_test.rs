//! Scenario tests: the production driver on virtual time.

use std::time::Duration;

use tokenring_core::{AckPolicy, NodeId, RingConfig, RoundSummary, Timing};
use tokenring_harness::scenario::{Scenario, oracle};
use tokenring_runtime::StopReason;

fn gated(size: usize) -> RingConfig {
    RingConfig::privilege(size, AckPolicy::Gate)
}

fn render(summary: &RoundSummary) -> String {
    let mut acks = summary.acknowledgments.clone();
    acks.sort();
    let missing: Vec<String> = summary.missing.iter().map(ToString::to_string).collect();
    let or_dash = |items: Vec<String>| if items.is_empty() { "-".to_string() } else { items.join(",") };

    format!(
        "round {} holder {} entered {} sent {} acked {} missing {}",
        summary.round,
        summary.holder,
        summary.entered,
        summary.broadcasts.join(","),
        or_dash(acks),
        or_dash(missing)
    )
}

#[test]
fn basic_ring_circulates_in_order() {
    let result = Scenario::new()
        .with_config(RingConfig::basic(4))
        .with_seed(3)
        .with_rounds(8)
        .oracle(oracle::all_of(vec![
            oracle::ring_order(),
            oracle::mutual_exclusion(),
            oracle::completed_rounds(8),
        ]))
        .run();

    assert_eq!(result, Ok(()));
}

#[test]
fn gated_ring_collects_all_acknowledgments() {
    let result = Scenario::new()
        .with_config(gated(3))
        .with_rounds(6)
        .oracle(oracle::all_of(vec![
            oracle::ring_order(),
            oracle::mutual_exclusion(),
            oracle::acknowledgments_accounted(),
            Box::new(|world| {
                if world.acknowledgments() != 12 {
                    return Err(format!("{} acknowledgments, expected 12", world.acknowledgments()));
                }
                if !world.missing().is_empty() {
                    return Err(format!("unexpected missing: {:?}", world.missing()));
                }
                Ok(())
            }),
        ]))
        .run();

    assert_eq!(result, Ok(()));
}

#[test]
fn silent_node_is_reported_once_per_round() {
    let world = Scenario::new()
        .with_config(gated(4))
        .with_rounds(4)
        .with_silent_nodes([NodeId(2)])
        .oracle(oracle::acknowledgments_accounted())
        .world()
        .unwrap();

    // Round 2 is node 2's own round.
    assert_eq!(world.missing(), vec![(NodeId(2), 0), (NodeId(2), 1), (NodeId(2), 3)]);
    assert_eq!(world.report().rounds, 4);
}

#[test]
fn lossy_acks_never_stall_the_ring() {
    let result = Scenario::new()
        .with_config(gated(5))
        .with_seed(77)
        .with_rounds(10)
        .with_ack_loss(0.3)
        .with_ack_jitter(Duration::from_millis(2500))
        .oracle(oracle::all_of(vec![
            oracle::ring_order(),
            oracle::mutual_exclusion(),
            oracle::acknowledgments_accounted(),
            oracle::completed_rounds(10),
        ]))
        .run();

    assert_eq!(result, Ok(()));
}

#[test]
fn acknowledgments_due_at_the_timeout_are_not_missing() {
    let timing = Timing {
        ack_delay: Duration::from_secs(2),
        ack_timeout: Duration::from_secs(2),
        ..Timing::default()
    };
    let world = Scenario::new()
        .with_config(gated(4).with_timing(timing))
        .with_rounds(4)
        .oracle(oracle::acknowledgments_accounted())
        .world()
        .unwrap();

    assert_eq!(world.acknowledgments(), 12);
    assert!(world.missing().is_empty());
}

#[test]
fn fire_and_forget_ring_keeps_cadence() {
    let world = Scenario::new()
        .with_config(RingConfig::privilege(3, AckPolicy::FireAndForget))
        .with_rounds(4)
        .with_silent_nodes([NodeId(1)])
        .oracle(oracle::all_of(vec![oracle::ring_order(), oracle::mutual_exclusion()]))
        .world()
        .unwrap();

    assert_eq!(world.report().rounds, 4);
    assert!(world.missing().is_empty());
    // Summaries are taken at handover, before any acknowledgment arrives.
    assert!(world.rounds().iter().all(|summary| summary.acknowledgments.is_empty()));
}

#[test]
fn stop_ends_the_run_mid_round() {
    let world = Scenario::new()
        .with_config(RingConfig::basic(3))
        .with_rounds(100)
        .with_stop_after(Duration::from_millis(4500))
        .oracle(Box::new(|_| Ok(())))
        .world()
        .unwrap();

    let report = world.report();
    assert_eq!(report.reason, StopReason::Signal);
    assert_eq!(report.rounds, 2);
    assert!(report.snapshot.stopped);
    assert_eq!(world.holders(), vec![NodeId(0), NodeId(1), NodeId(2)]);
}

#[test]
fn gated_round_summaries() {
    let world = Scenario::new()
        .with_config(gated(3))
        .with_rounds(3)
        .with_decisions(vec![true, false])
        .with_silent_nodes([NodeId(2)])
        .oracle(Box::new(|_| Ok(())))
        .world()
        .unwrap();

    let trace: Vec<String> = world.rounds().into_iter().map(render).collect();
    insta::assert_snapshot!(trace.join("\n"), @r"
    round 0 holder 0 entered true sent m01,m02 acked r10 missing 2
    round 1 holder 1 entered false sent m12,m10 acked r01 missing 2
    round 2 holder 2 entered true sent m20,m21 acked r02,r12 missing -
    ");
}
