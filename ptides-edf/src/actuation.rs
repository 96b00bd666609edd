/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timestamp-ordered actuation queue.
//!
//! Outputs must leave the platform exactly at their model timestamp, not when
//! the actor producing them happens to fire.  Actuations are parked here in a
//! second fixed pool, kept as a singly linked list sorted by time, and drained
//! from the actuation timer interrupt.

use tracing::trace;

use crate::error::FatalError;
use crate::event::{ActuatorId, Payload};
use crate::time::Time;

/// One pending output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actuation {
    pub at: Time,
    pub actuator: ActuatorId,
    pub value: Payload,
}

#[derive(Debug, Clone, Copy)]
struct ActuationSlot {
    entry: Actuation,
    next: Option<u16>,
}

#[derive(Debug)]
pub struct ActuationQueue {
    slots: Box<[ActuationSlot]>,
    head: Option<u16>,
    free_head: Option<u16>,
    len: usize,
}

impl ActuationQueue {
    /// # Panics
    /// If `capacity` exceeds `u16::MAX`.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity <= usize::from(u16::MAX),
            "actuation queue capacity {capacity} exceeds {}",
            u16::MAX
        );
        let empty = ActuationSlot {
            entry: Actuation {
                at: Time::ZERO,
                actuator: ActuatorId(0),
                value: Payload::Pure,
            },
            next: None,
        };
        let mut queue = Self {
            slots: vec![empty; capacity].into_boxed_slice(),
            head: None,
            free_head: None,
            len: 0,
        };
        queue.clear();
        queue
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every pending actuation and rebuild the free list.
    pub fn clear(&mut self) {
        let capacity = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.next = if i + 1 < capacity {
                Some((i + 1) as u16)
            } else {
                None
            };
        }
        self.free_head = if capacity > 0 { Some(0) } else { None };
        self.head = None;
        self.len = 0;
    }

    /// Time of the earliest pending actuation.
    pub fn peek_time(&self) -> Option<Time> {
        self.head.map(|h| self.slots[usize::from(h)].entry.at)
    }

    /// Insert in time order, after any entries with the same time.
    ///
    /// Returns `true` when the new entry became the head, i.e. the actuation
    /// timer has to be re-armed.
    ///
    /// # Errors
    /// [`FatalError::ActuationQueueFull`] when no slot is free.
    pub fn schedule(&mut self, entry: Actuation) -> Result<bool, FatalError> {
        let index = self.free_head.ok_or(FatalError::ActuationQueueFull {
            capacity: self.slots.len(),
        })?;
        self.free_head = self.slots[usize::from(index)].next;
        self.slots[usize::from(index)].entry = entry;

        let mut before: Option<u16> = None;
        let mut cursor = self.head;
        while let Some(current) = cursor {
            let slot = &self.slots[usize::from(current)];
            if slot.entry.at > entry.at {
                break;
            }
            before = Some(current);
            cursor = slot.next;
        }

        self.slots[usize::from(index)].next = cursor;
        match before {
            Some(before) => self.slots[usize::from(before)].next = Some(index),
            None => self.head = Some(index),
        }
        self.len += 1;

        trace!(actuator = %entry.actuator, at = %entry.at, pending = self.len, "actuation scheduled");
        Ok(before.is_none())
    }

    /// Pop the head if its time is at or before `now`.
    pub fn pop_due(&mut self, now: Time) -> Option<Actuation> {
        let head = self.head?;
        let slot = self.slots[usize::from(head)];
        if slot.entry.at > now {
            return None;
        }
        self.head = slot.next;
        self.slots[usize::from(head)].next = self.free_head;
        self.free_head = Some(head);
        self.len -= 1;
        Some(slot.entry)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u32, actuator: u16) -> Actuation {
        Actuation {
            at: Time::from_secs(secs),
            actuator: ActuatorId(actuator),
            value: Payload::Int(secs as i16),
        }
    }

    #[test]
    fn entries_come_out_in_time_order() {
        let mut q = ActuationQueue::with_capacity(4);
        assert!(q.schedule(at(5, 0)).unwrap());
        assert!(q.schedule(at(2, 1)).unwrap(), "earlier entry becomes head");
        assert!(!q.schedule(at(9, 2)).unwrap());
        assert_eq!(q.peek_time(), Some(Time::from_secs(2)));

        let drained: Vec<u16> = std::iter::from_fn(|| q.pop_due(Time::MAX))
            .map(|a| a.actuator.0)
            .collect();
        assert_eq!(drained, vec![1, 0, 2]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_times_keep_arrival_order() {
        let mut q = ActuationQueue::with_capacity(3);
        q.schedule(at(3, 0)).unwrap();
        assert!(!q.schedule(at(3, 1)).unwrap());
        assert_eq!(q.pop_due(Time::from_secs(3)).unwrap().actuator, ActuatorId(0));
        assert_eq!(q.pop_due(Time::from_secs(3)).unwrap().actuator, ActuatorId(1));
    }

    #[test]
    fn pop_due_leaves_future_entries() {
        let mut q = ActuationQueue::with_capacity(2);
        q.schedule(at(4, 0)).unwrap();
        assert_eq!(q.pop_due(Time::from_secs(3)), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_is_fatal_and_slots_are_recycled() {
        let mut q = ActuationQueue::with_capacity(2);
        q.schedule(at(1, 0)).unwrap();
        q.schedule(at(2, 0)).unwrap();
        assert!(matches!(
            q.schedule(at(3, 0)),
            Err(FatalError::ActuationQueueFull { capacity: 2 })
        ));
        q.pop_due(Time::from_secs(1)).unwrap();
        q.schedule(at(3, 0)).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn zero_capacity_queue_is_always_full() {
        let mut q = ActuationQueue::with_capacity(0);
        assert!(q.schedule(at(1, 0)).is_err());
    }
}
