/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deadline-ordered event queue.
//!
//! A doubly linked list threaded through [`EventArena`] slots, kept sorted by
//! [`compare_events`].  The queue only stores head / tail / length; the links
//! themselves live in the arena, so the queue never allocates.
//!
//! Callers serialise access with the ISR producer path through a
//! [`CriticalSection`](crate::platform::CriticalSection); nothing in here is
//! re-entrant.

use std::cmp::Ordering;

use tracing::trace;

use crate::arena::{EventArena, GroupRun};
use crate::error::{ConsistencyFault, FatalError, SlotState};
use crate::event::{Event, EventHandle};

/// Total scheduling order: `(deadline, timestamp, microstep, depth)`, then
/// destination actor.
///
/// The trailing actor key keeps every same-tag event for one actor adjacent
/// even when several actors share a depth, which [`DeadlineQueue::remove_group`]
/// relies on.
pub fn compare_events(a: &Event, b: &Event) -> Ordering {
    a.deadline
        .cmp(&b.deadline)
        .then_with(|| a.tag.timestamp.cmp(&b.tag.timestamp))
        .then_with(|| a.tag.microstep.cmp(&b.tag.microstep))
        .then_with(|| a.depth.cmp(&b.depth))
        .then_with(|| a.actor.cmp(&b.actor))
}

// ── DeadlineQueue ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DeadlineQueue {
    head: Option<EventHandle>,
    tail: Option<EventHandle>,
    len: usize,
}

impl DeadlineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<EventHandle> {
        self.head
    }

    pub fn tail(&self) -> Option<EventHandle> {
        self.tail
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `peekNextEvent`: the head for `None`, otherwise the successor of `after`.
    pub fn peek_after(&self, arena: &EventArena, after: Option<EventHandle>) -> Option<EventHandle> {
        match after {
            None => self.head,
            Some(h) => arena.next(h),
        }
    }

    /// Handles from head to tail.
    pub fn iter<'a>(&self, arena: &'a EventArena) -> impl Iterator<Item = EventHandle> + 'a {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let handle = cursor?;
            cursor = arena.next(handle);
            Some(handle)
        })
    }

    /// Drop every link.  Slots are *not* returned to the arena; callers reset
    /// both together.
    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Insert an allocated slot in sorted position.
    ///
    /// Scans from the tail towards the head and links the new event right
    /// after the first element that does not sort after it, so events with
    /// fully equal keys keep their arrival order.
    ///
    /// # Errors
    /// [`ConsistencyFault::UnexpectedSlotState`] unless the slot is
    /// `Allocated`.
    pub fn insert(&mut self, arena: &mut EventArena, handle: EventHandle) -> Result<(), FatalError> {
        arena.check_range(handle)?;
        let state = arena.state(handle);
        if state != SlotState::Allocated {
            return Err(ConsistencyFault::UnexpectedSlotState {
                handle,
                expected: SlotState::Allocated,
                found: state,
            }
            .into());
        }

        let new = *arena.event(handle);
        let mut cursor = self.tail;
        while let Some(current) = cursor {
            if compare_events(arena.event(current), &new) != Ordering::Greater {
                break;
            }
            cursor = arena.prev(current);
        }

        match cursor {
            None => {
                arena.set_prev(handle, None);
                arena.set_next(handle, self.head);
                match self.head {
                    Some(old_head) => arena.set_prev(old_head, Some(handle)),
                    None => self.tail = Some(handle),
                }
                self.head = Some(handle);
            }
            Some(before) => {
                let after = arena.next(before);
                arena.set_prev(handle, Some(before));
                arena.set_next(handle, after);
                arena.set_next(before, Some(handle));
                match after {
                    Some(after) => arena.set_prev(after, Some(handle)),
                    None => self.tail = Some(handle),
                }
            }
        }

        arena.set_state(handle, SlotState::Queued);
        self.len += 1;

        trace!(
            slot = %handle,
            deadline = %new.deadline,
            tag = %new.tag,
            queued = self.len,
            "event queued"
        );
        Ok(())
    }

    /// Remove `lead` and every immediately following event with the same tag
    /// and destination actor.
    ///
    /// `deliver` is called for each removed event, in queue order, before the
    /// run is unlinked.  The removed slots are marked `Firing` and stay chained
    /// through their `next` links; the returned [`GroupRun`] is handed back to
    /// [`EventArena::release_run`] once the fire has completed.
    ///
    /// # Errors
    /// [`ConsistencyFault::EventNotQueued`] if `lead` is not in the queue.
    pub fn remove_group<F>(
        &mut self,
        arena: &mut EventArena,
        lead: EventHandle,
        mut deliver: F,
    ) -> Result<GroupRun, FatalError>
    where
        F: FnMut(EventHandle, &Event),
    {
        arena.check_range(lead)?;
        if arena.state(lead) != SlotState::Queued {
            return Err(ConsistencyFault::EventNotQueued { handle: lead }.into());
        }

        let lead_event = *arena.event(lead);
        deliver(lead, &lead_event);
        arena.set_state(lead, SlotState::Firing);

        let mut last = lead;
        let mut len = 1usize;
        while let Some(next) = arena.next(last) {
            let next_event = *arena.event(next);
            if !next_event.fires_with(&lead_event) {
                break;
            }
            deliver(next, &next_event);
            arena.set_state(next, SlotState::Firing);
            last = next;
            len += 1;
        }

        // Cut [lead ..= last] out in one step.
        let before = arena.prev(lead);
        let after = arena.next(last);
        match before {
            Some(before) => arena.set_next(before, after),
            None => self.head = after,
        }
        match after {
            Some(after) => arena.set_prev(after, before),
            None => self.tail = before,
        }
        arena.set_prev(lead, None);
        arena.set_next(last, None);
        self.len -= len;

        trace!(lead = %lead, grouped = len, queued = self.len, "event group removed");
        Ok(GroupRun {
            first: lead,
            last,
            len,
        })
    }

    /// Walk the whole list and verify links, ordering, slot states and length.
    pub fn check_consistency(&self, arena: &EventArena) -> Result<(), FatalError> {
        let mut walked = 0usize;
        let mut prev: Option<EventHandle> = None;
        let mut cursor = self.head;

        while let Some(handle) = cursor {
            arena.check_range(handle)?;
            if arena.prev(handle) != prev {
                return Err(ConsistencyFault::BrokenLink { at: handle }.into());
            }
            let state = arena.state(handle);
            if state != SlotState::Queued {
                return Err(ConsistencyFault::UnexpectedSlotState {
                    handle,
                    expected: SlotState::Queued,
                    found: state,
                }
                .into());
            }
            if let Some(p) = prev {
                if compare_events(arena.event(p), arena.event(handle)) == Ordering::Greater {
                    return Err(ConsistencyFault::OrderViolation {
                        earlier: p,
                        later: handle,
                    }
                    .into());
                }
            }
            walked += 1;
            if walked > self.len {
                break;
            }
            prev = Some(handle);
            cursor = arena.next(handle);
        }

        if walked != self.len {
            return Err(ConsistencyFault::LengthMismatch {
                counted: self.len,
                walked,
            }
            .into());
        }
        if self.tail != prev {
            let at = self.tail.or(prev).unwrap_or(EventHandle(0));
            return Err(ConsistencyFault::BrokenLink { at }.into());
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
