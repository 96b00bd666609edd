/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-capacity event pool with an explicit free list.
//!
//! All slots are allocated once at boot.  At run time `allocate` and `release`
//! only move indices between the singly-linked free list and the caller, so
//! their latency is constant and nothing touches the heap.
//!
//! Every slot carries a [`SlotState`]; operations check it and report a
//! [`ConsistencyFault`] instead of silently corrupting the lists.
//!
//! ```text
//! Free ──allocate──► Allocated ──queue insert──► Queued ──remove_group──► Firing
//!   ▲                    │                                                  │
//!   └──────release───────┘◄─────────────────release_run─────────────────────┘
//! ```

use tracing::trace;

use crate::error::{ConsistencyFault, FatalError, SlotState};
use crate::event::{Event, EventHandle};

/// Largest supported arena: handles are `u16` indices.
pub const MAX_ARENA_CAPACITY: usize = u16::MAX as usize;

// ── Slot ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Slot {
    event: Event,
    /// Free-list link while `Free`; queue / run link otherwise.
    next: Option<EventHandle>,
    prev: Option<EventHandle>,
    state: SlotState,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            event: Event::default(),
            next: None,
            prev: None,
            state: SlotState::Free,
        }
    }
}

// ── GroupRun ──────────────────────────────────────────────────────────────────

/// A contiguous run of slots detached from the deadline queue in one group
/// removal, still chained through their `next` links.
///
/// Handed back to [`EventArena::release_run`] as a unit, so the run is spliced
/// onto the free list without walking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRun {
    pub first: EventHandle,
    pub last: EventHandle,
    pub len: usize,
}

// ── EventArena ────────────────────────────────────────────────────────────────

/// Pool of `MAX_EVENTS` event slots.
#[derive(Debug)]
pub struct EventArena {
    slots: Box<[Slot]>,
    free_head: Option<EventHandle>,
    free_len: usize,
}

impl EventArena {
    /// Allocate `capacity` slots and thread them all onto the free list.
    ///
    /// # Panics
    /// If `capacity` is zero or exceeds [`MAX_ARENA_CAPACITY`].  Both are boot
    /// time configuration errors, rejected earlier by
    /// [`DirectorConfig`](crate::config::DirectorConfig) validation.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            (1..=MAX_ARENA_CAPACITY).contains(&capacity),
            "event arena capacity must be in 1..={MAX_ARENA_CAPACITY}, got {capacity}"
        );
        let mut arena = Self {
            slots: vec![Slot::default(); capacity].into_boxed_slice(),
            free_head: None,
            free_len: 0,
        };
        arena.reset();
        arena
    }

    /// `initializeEvents`: put every slot back on the free list.
    pub fn reset(&mut self) {
        let capacity = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.event = Event::default();
            slot.prev = None;
            slot.state = SlotState::Free;
            slot.next = if i + 1 < capacity {
                Some(EventHandle((i + 1) as u16))
            } else {
                None
            };
        }
        self.free_head = Some(EventHandle(0));
        self.free_len = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots on the free list.
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Pop a slot off the free list.  The slot's event is reset to default.
    ///
    /// # Errors
    /// [`FatalError::OutOfEventMemory`] if the free list is empty.
    pub fn allocate(&mut self) -> Result<EventHandle, FatalError> {
        let handle = self.free_head.ok_or(FatalError::OutOfEventMemory {
            capacity: self.slots.len(),
        })?;
        let slot = &mut self.slots[handle.index()];
        if slot.state != SlotState::Free {
            return Err(ConsistencyFault::UnexpectedSlotState {
                handle,
                expected: SlotState::Free,
                found: slot.state,
            }
            .into());
        }
        self.free_head = slot.next;
        self.free_len -= 1;

        slot.event = Event::default();
        slot.next = None;
        slot.prev = None;
        slot.state = SlotState::Allocated;

        trace!(slot = %handle, free = self.free_len, "allocated event slot");
        Ok(handle)
    }

    /// Push a single slot back onto the free list.
    ///
    /// The slot must not be linked into the deadline queue.
    ///
    /// # Errors
    /// [`ConsistencyFault::UnexpectedSlotState`] if the slot is free already or
    /// still queued.
    pub fn release(&mut self, handle: EventHandle) -> Result<(), FatalError> {
        self.check_range(handle)?;
        let slot = &mut self.slots[handle.index()];
        match slot.state {
            SlotState::Allocated | SlotState::Firing => {}
            found => {
                return Err(ConsistencyFault::UnexpectedSlotState {
                    handle,
                    expected: SlotState::Allocated,
                    found,
                }
                .into())
            }
        }
        slot.state = SlotState::Free;
        slot.prev = None;
        slot.next = self.free_head;
        self.free_head = Some(handle);
        self.free_len += 1;

        trace!(slot = %handle, free = self.free_len, "released event slot");
        Ok(())
    }

    /// Splice a whole [`GroupRun`] onto the free list.
    ///
    /// # Errors
    /// [`ConsistencyFault`] if a slot of the run is not `Firing` or the run's
    /// links do not end at `run.last` after `run.len` slots.
    pub fn release_run(&mut self, run: GroupRun) -> Result<(), FatalError> {
        let mut cursor = Some(run.first);
        let mut last_seen = run.first;
        for _ in 0..run.len {
            let handle = cursor.ok_or(ConsistencyFault::BrokenLink { at: last_seen })?;
            self.check_range(handle)?;
            let slot = &mut self.slots[handle.index()];
            if slot.state != SlotState::Firing {
                return Err(ConsistencyFault::UnexpectedSlotState {
                    handle,
                    expected: SlotState::Firing,
                    found: slot.state,
                }
                .into());
            }
            slot.state = SlotState::Free;
            slot.prev = None;
            last_seen = handle;
            cursor = slot.next;
        }
        if last_seen != run.last {
            return Err(ConsistencyFault::BrokenLink { at: last_seen }.into());
        }

        self.slots[run.last.index()].next = self.free_head;
        self.free_head = Some(run.first);
        self.free_len += run.len;

        trace!(first = %run.first, len = run.len, free = self.free_len, "released group run");
        Ok(())
    }

    /// Iterate the handles of a detached run, first to last.
    pub fn run_handles(&self, run: GroupRun) -> impl Iterator<Item = EventHandle> + '_ {
        let mut cursor = Some(run.first);
        (0..run.len).map_while(move |_| {
            let handle = cursor?;
            cursor = self.slots.get(handle.index()).and_then(|s| s.next);
            Some(handle)
        })
    }

    pub fn event(&self, handle: EventHandle) -> &Event {
        &self.slots[handle.index()].event
    }

    pub fn event_mut(&mut self, handle: EventHandle) -> &mut Event {
        &mut self.slots[handle.index()].event
    }

    pub fn state(&self, handle: EventHandle) -> SlotState {
        self.slots[handle.index()].state
    }

    // ── Link access for the deadline queue ────────────────────────────────────

    pub(crate) fn next(&self, handle: EventHandle) -> Option<EventHandle> {
        self.slots[handle.index()].next
    }

    pub(crate) fn prev(&self, handle: EventHandle) -> Option<EventHandle> {
        self.slots[handle.index()].prev
    }

    pub(crate) fn set_next(&mut self, handle: EventHandle, next: Option<EventHandle>) {
        self.slots[handle.index()].next = next;
    }

    pub(crate) fn set_prev(&mut self, handle: EventHandle, prev: Option<EventHandle>) {
        self.slots[handle.index()].prev = prev;
    }

    pub(crate) fn set_state(&mut self, handle: EventHandle, state: SlotState) {
        self.slots[handle.index()].state = state;
    }

    pub(crate) fn check_range(&self, handle: EventHandle) -> Result<(), ConsistencyFault> {
        if handle.index() < self.slots.len() {
            Ok(())
        } else {
            Err(ConsistencyFault::HandleOutOfRange {
                handle,
                capacity: self.slots.len(),
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;

    #[test]
    fn new_arena_is_all_free() {
        let arena = EventArena::with_capacity(4);
        assert_eq!(arena.capacity(), 4);
        assert_eq!(arena.free_len(), 4);
    }

    #[test]
    fn allocate_pops_distinct_slots_in_order() {
        let mut arena = EventArena::with_capacity(3);
        let a = arena.allocate().unwrap();
        let b = arena.allocate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.free_len(), 1);
        assert_eq!(arena.state(a), SlotState::Allocated);
    }

    #[test]
    fn fourth_allocation_of_three_slots_is_out_of_memory() {
        let mut arena = EventArena::with_capacity(3);
        for _ in 0..3 {
            arena.allocate().unwrap();
        }
        let err = arena.allocate().unwrap_err();
        assert!(matches!(err, FatalError::OutOfEventMemory { capacity: 3 }));
        assert_eq!(arena.free_len(), 0, "failed allocation must not change the pool");
    }

    #[test]
    fn released_slot_is_reused_first() {
        let mut arena = EventArena::with_capacity(3);
        let a = arena.allocate().unwrap();
        let _b = arena.allocate().unwrap();
        arena.release(a).unwrap();
        assert_eq!(arena.allocate().unwrap(), a);
    }

    #[test]
    fn allocate_resets_previous_contents() {
        let mut arena = EventArena::with_capacity(1);
        let a = arena.allocate().unwrap();
        arena.event_mut(a).payload = Payload::Long(42);
        arena.release(a).unwrap();
        let again = arena.allocate().unwrap();
        assert_eq!(arena.event(again).payload, Payload::Pure);
    }

    #[test]
    fn double_release_is_a_consistency_fault() {
        let mut arena = EventArena::with_capacity(2);
        let a = arena.allocate().unwrap();
        arena.release(a).unwrap();
        let err = arena.release(a).unwrap_err();
        assert!(matches!(
            err,
            FatalError::QueueConsistencyViolation(ConsistencyFault::UnexpectedSlotState {
                found: SlotState::Free,
                ..
            })
        ));
        assert_eq!(arena.free_len(), 2);
    }

    #[test]
    fn releasing_a_queued_slot_is_rejected() {
        let mut arena = EventArena::with_capacity(2);
        let a = arena.allocate().unwrap();
        arena.set_state(a, SlotState::Queued);
        assert!(arena.release(a).is_err());
    }

    #[test]
    fn release_run_splices_whole_chain() {
        let mut arena = EventArena::with_capacity(4);
        let a = arena.allocate().unwrap();
        let b = arena.allocate().unwrap();
        let c = arena.allocate().unwrap();
        for h in [a, b, c] {
            arena.set_state(h, SlotState::Firing);
        }
        arena.set_next(a, Some(b));
        arena.set_next(b, Some(c));
        arena.set_next(c, None);
        let run = GroupRun {
            first: a,
            last: c,
            len: 3,
        };
        assert_eq!(arena.run_handles(run).collect::<Vec<_>>(), vec![a, b, c]);

        arena.release_run(run).unwrap();
        assert_eq!(arena.free_len(), 4);
        // LIFO: the run comes back first, in run order
        assert_eq!(arena.allocate().unwrap(), a);
        assert_eq!(arena.allocate().unwrap(), b);
        assert_eq!(arena.allocate().unwrap(), c);
    }

    #[test]
    fn release_run_detects_short_chain() {
        let mut arena = EventArena::with_capacity(3);
        let a = arena.allocate().unwrap();
        let b = arena.allocate().unwrap();
        arena.set_state(a, SlotState::Firing);
        arena.set_state(b, SlotState::Firing);
        arena.set_next(a, None);
        let run = GroupRun {
            first: a,
            last: b,
            len: 2,
        };
        assert!(arena.release_run(run).is_err());
    }

    #[test]
    fn reset_returns_everything_to_the_free_list() {
        let mut arena = EventArena::with_capacity(3);
        arena.allocate().unwrap();
        arena.allocate().unwrap();
        arena.reset();
        assert_eq!(arena.free_len(), 3);
    }
}
