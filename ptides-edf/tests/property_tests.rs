//! Property-based tests for the event arena and deadline queue.
//!
//! Random interleavings of insertions and head-group removals must keep the
//! queue sorted and linked, and must never lose or duplicate a slot.

use std::cmp::Ordering;

use proptest::prelude::*;

use ptides_edf::arena::EventArena;
use ptides_edf::event::{ActorId, Event};
use ptides_edf::queue::{compare_events, DeadlineQueue};
use ptides_edf::safe_time::offset_time;
use ptides_edf::time::{SignedTime, Tag, Time};

const CAPACITY: usize = 12;

#[derive(Debug, Clone)]
enum Op {
    Insert(Event),
    RemoveHead,
}

/// Small value ranges so equal keys and same-tag groups actually occur.
///
/// Deadline and depth are fixed per actor, as the director derives them from
/// the actor's configured offset and depth.  Actors 0 and 2 share a depth.
fn event_strategy() -> impl Strategy<Value = Event> {
    (0u32..4, 0u16..3, 0u16..4).prop_map(|(ts, microstep, actor)| Event {
        deadline: Time::from_secs(ts + u32::from(actor % 3)),
        tag: Tag::new(Time::from_secs(ts), microstep),
        depth: u32::from(actor % 2),
        actor: ActorId(actor),
        ..Default::default()
    })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => event_strategy().prop_map(Op::Insert),
        1 => Just(Op::RemoveHead),
    ]
}

fn key(e: &Event) -> (Time, Time, u16, u32, ActorId) {
    (e.deadline, e.tag.timestamp, e.tag.microstep, e.depth, e.actor)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(300))]

    // -- Queue ordering and slot conservation ----------------------------------

    /// After every operation the queue walks in non-decreasing order and
    /// free + queued slots add up to the capacity.
    #[test]
    fn prop_queue_stays_sorted_and_slots_are_conserved(
        ops in prop::collection::vec(op_strategy(), 1..80)
    ) {
        let mut arena = EventArena::with_capacity(CAPACITY);
        let mut queue = DeadlineQueue::new();

        for op in ops {
            match op {
                Op::Insert(event) => {
                    if arena.free_len() == 0 {
                        continue;
                    }
                    let handle = arena.allocate().unwrap();
                    *arena.event_mut(handle) = event;
                    queue.insert(&mut arena, handle).unwrap();
                }
                Op::RemoveHead => {
                    let Some(head) = queue.head() else { continue };
                    let lead = *arena.event(head);
                    let mut delivered = Vec::new();
                    let run = queue
                        .remove_group(&mut arena, head, |_, e| delivered.push(*e))
                        .unwrap();
                    prop_assert_eq!(run.len, delivered.len());
                    for e in &delivered {
                        prop_assert!(e.fires_with(&lead), "grouped {:?} with lead {:?}", e, lead);
                    }
                    for left in queue.iter(&arena) {
                        prop_assert!(
                            !arena.event(left).fires_with(&lead),
                            "{:?} still queued after its group with {:?} fired",
                            arena.event(left),
                            lead
                        );
                    }
                    arena.release_run(run).unwrap();
                }
            }

            prop_assert!(queue.check_consistency(&arena).is_ok());
            prop_assert_eq!(arena.free_len() + queue.len(), CAPACITY);

            let walked: Vec<Event> = queue.iter(&arena).map(|h| *arena.event(h)).collect();
            for pair in walked.windows(2) {
                prop_assert_ne!(compare_events(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }

    /// The final order of keys does not depend on insertion order.
    #[test]
    fn prop_insertion_order_does_not_change_key_order(
        (events, shuffled) in prop::collection::vec(event_strategy(), 1..CAPACITY)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let keys_after = |events: &[Event]| {
            let mut arena = EventArena::with_capacity(CAPACITY);
            let mut queue = DeadlineQueue::new();
            for event in events {
                let handle = arena.allocate().unwrap();
                *arena.event_mut(handle) = *event;
                queue.insert(&mut arena, handle).unwrap();
            }
            queue.iter(&arena).map(|h| key(arena.event(h))).collect::<Vec<_>>()
        };

        prop_assert_eq!(keys_after(&events), keys_after(&shuffled));
    }

    // -- Safe-to-process arithmetic --------------------------------------------

    /// offset_time is timestamp − offset in exact integer nanoseconds,
    /// clamped at zero.
    #[test]
    fn prop_offset_time_matches_integer_arithmetic(
        ts_ns in 0u64..1_000_000_000_000,
        offset_ns in -1_000_000_000_000i64..1_000_000_000_000
    ) {
        let got = offset_time(Time::from_nanos(ts_ns), SignedTime::from_nanos(offset_ns));
        let expected = (i128::from(ts_ns) - i128::from(offset_ns)).max(0);
        prop_assert_eq!(i128::from(got.as_nanos()), expected);
        prop_assert!(got.nsecs() < 1_000_000_000);
    }
}
