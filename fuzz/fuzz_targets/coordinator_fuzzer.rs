//! Fuzz target for the [`TokenCoordinator`] state machine
//!
//! Prevent double ownership and stuck rings via arbitrary driver behaviour
//!
//! # Strategy
//!
//! - Call sequences: advance, dwell completion, acknowledgments, timeouts and
//!   stop in any order, including out-of-phase calls
//! - Forged acknowledgments: unknown senders, wrong holders, broadcasts
//!   posing as acknowledgments, stale and future rounds
//! - All ring sizes up to the variant bound, both acknowledgment policies
//!
//! # Invariants
//!
//! - Exactly one node holds the token after every call
//! - The occupant, if any, is the holder and the phase is `InCriticalSection`
//! - A rejected call changes nothing
//! - The round counter never decreases and only grows by handover
//! - Each `(round, sender)` acknowledgment is reported at most once
//! - No transition after stop
//! - NEVER panic on a forged message

#![no_main]

use std::{
    cell::Cell,
    collections::BTreeSet,
    rc::Rc,
    sync::Arc,
};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokenring_core::{
    AckPolicy, EventLog, Message, MessageKind, NodeId, Phase, RingConfig, RingEvent, Timing,
    TokenCoordinator, Variant,
};

#[derive(Debug, Clone, Arbitrary)]
enum CoordinatorEvent {
    Advance { enter: bool },
    CompleteDwell,
    Deliver(FuzzedMessage),
    Timeout { round_offset: i8 },
    Stop,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzedMessage {
    sender: u8,
    recipient: u8,
    broadcast: bool,
    round_offset: i8,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    size: u8,
    privilege: bool,
    gate: bool,
    events: Vec<CoordinatorEvent>,
}

fn offset(round: u64, by: i8) -> u64 {
    round.wrapping_add_signed(i64::from(by))
}

fuzz_target!(|input: FuzzInput| {
    let variant = if input.privilege {
        let policy = if input.gate { AckPolicy::Gate } else { AckPolicy::FireAndForget };
        Variant::Privilege { policy }
    } else {
        Variant::Basic
    };
    let size = usize::from(input.size % 12);
    let config = RingConfig { size, variant, timing: Timing::instant() };

    let log = Arc::new(EventLog::new());
    let next = Rc::new(Cell::new(false));
    let decision = Rc::clone(&next);

    let mut ring =
        match TokenCoordinator::new(config, Arc::clone(&log), move |_: NodeId| decision.get()) {
            Ok(ring) => ring,
            Err(_) => {
                assert!(size == 0 || size > variant.max_ring_size());
                return;
            },
        };

    let mut reported = BTreeSet::new();

    for event in input.events {
        let before = ring.snapshot();
        let events_before = log.len();
        let mut delivered = None;

        let result = match event {
            CoordinatorEvent::Advance { enter } => {
                next.set(enter);
                ring.advance()
            },
            CoordinatorEvent::CompleteDwell => ring.complete_dwell(),
            CoordinatorEvent::Deliver(fuzzed) => {
                let round = offset(ring.ledger().round().unwrap_or(ring.round()), fuzzed.round_offset);
                let mut message = Message::acknowledgment(
                    NodeId(u32::from(fuzzed.sender) % 12),
                    NodeId(u32::from(fuzzed.recipient) % 12),
                    round,
                );
                if fuzzed.broadcast {
                    message.kind = MessageKind::Broadcast;
                }
                delivered = Some((message.round, message.sender));
                ring.record_ack(message)
            },
            CoordinatorEvent::Timeout { round_offset } => {
                ring.ack_timeout(offset(ring.round(), round_offset))
            },
            CoordinatorEvent::Stop => {
                ring.stop();
                Ok(Vec::new())
            },
        };

        let after = ring.snapshot();

        assert_eq!(after.holders, vec![after.holder], "exactly one holder");
        match after.occupant {
            Some(occupant) => {
                assert_eq!(occupant, after.holder);
                assert_eq!(after.phase, Phase::InCriticalSection);
            },
            None => assert_ne!(after.phase, Phase::InCriticalSection),
        }
        assert!(after.round == before.round || after.round == before.round + 1);

        let new_events = log.events().split_off(events_before);
        let acknowledged =
            new_events.iter().any(|e| matches!(e, RingEvent::Acknowledgment { .. }));
        if let (true, Some(key)) = (acknowledged, delivered) {
            assert!(reported.insert(key), "acknowledgment {key:?} reported twice");
        }

        if result.is_err() || before.stopped {
            assert_eq!(after, before, "rejected or stopped call changed state");
            assert_eq!(log.len(), events_before, "rejected or stopped call emitted events");
        }
    }

    assert_eq!(log.rounds().len() as u64, ring.round());
});
