/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fatal error taxonomy for the event scheduler.
//!
//! Two types model the two layers:
//!
//! * [`ConsistencyFault`]: which scheduler invariant was found broken
//!   (low-level, carries the slot / actor involved).
//! * [`FatalError`]: what the [`Director`](crate::director::Director) hands to
//!   [`Platform::die`](crate::platform::Platform::die).
//!
//! None of these are recoverable.  An event that is not yet safe to process,
//! or an actor that is already executing, is ordinary control flow and never
//! shows up here.

use thiserror::Error;

use crate::event::{ActorId, ActuatorId, EventHandle, PortId};
use crate::time::Time;

// ── Consistency faults ────────────────────────────────────────────────────────

/// Lifecycle state of an arena slot, reported inside faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Allocated,
    Queued,
    Firing,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotState::Free => "free",
            SlotState::Allocated => "allocated",
            SlotState::Queued => "queued",
            SlotState::Firing => "firing",
        };
        f.write_str(s)
    }
}

/// Which queue / arena / stack invariant was violated.
///
/// Carried inside [`FatalError::QueueConsistencyViolation`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyFault {
    /// A slot was used in a state that does not permit the operation.
    UnexpectedSlotState {
        handle: EventHandle,
        expected: SlotState,
        found: SlotState,
    },

    /// A handle does not name a slot of this arena.
    HandleOutOfRange { handle: EventHandle, capacity: usize },

    /// `prev` / `next` pointers of neighbouring slots disagree.
    BrokenLink { at: EventHandle },

    /// Walking the queue found an element greater than its successor.
    OrderViolation {
        earlier: EventHandle,
        later: EventHandle,
    },

    /// The counted queue length differs from the walked length.
    LengthMismatch { counted: usize, walked: usize },

    /// A group removal was asked to start at an event that is not queued.
    EventNotQueued { handle: EventHandle },

    /// The fire capability for an actor is not installed (or is already
    /// lent out to an executing fire).
    ActorMissing { actor: ActorId },

    /// No configured actor owns the event's destination port.
    UnknownPort { port: PortId },

    /// No actor with this id is configured.
    UnknownActor { actor: ActorId },

    /// No actuator with this id is configured.
    UnknownActuator { actuator: ActuatorId },

    /// Free and queued slots no longer add up to the arena capacity.
    SlotsLeaked {
        free: usize,
        queued: usize,
        capacity: usize,
    },

    /// `pop()` on an empty preemption stack.
    StackUnderflow,

    /// Model-tag register restored with nothing stacked.
    ModelTagUnderflow,
}

impl std::fmt::Display for ConsistencyFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyFault::UnexpectedSlotState {
                handle,
                expected,
                found,
            } => write!(f, "{handle} is {found}, expected {expected}"),

            ConsistencyFault::HandleOutOfRange { handle, capacity } => {
                write!(f, "{handle} out of range for arena of {capacity} slots")
            }

            ConsistencyFault::BrokenLink { at } => {
                write!(f, "prev/next links disagree at {at}")
            }

            ConsistencyFault::OrderViolation { earlier, later } => write!(
                f,
                "{earlier} sorts after its successor {later}"
            ),

            ConsistencyFault::LengthMismatch { counted, walked } => write!(
                f,
                "queue length is {counted} but walking it found {walked} events"
            ),

            ConsistencyFault::EventNotQueued { handle } => {
                write!(f, "{handle} is not in the deadline queue")
            }

            ConsistencyFault::ActorMissing { actor } => {
                write!(f, "no fire capability installed for {actor}")
            }

            ConsistencyFault::UnknownPort { port } => {
                write!(f, "{port} is not owned by any configured actor")
            }

            ConsistencyFault::UnknownActor { actor } => {
                write!(f, "{actor} is not configured")
            }

            ConsistencyFault::UnknownActuator { actuator } => {
                write!(f, "{actuator} is not configured")
            }

            ConsistencyFault::SlotsLeaked {
                free,
                queued,
                capacity,
            } => write!(
                f,
                "{free} free + {queued} queued slots do not add up to {capacity}"
            ),

            ConsistencyFault::StackUnderflow => write!(f, "preemption stack popped while empty"),

            ConsistencyFault::ModelTagUnderflow => {
                write!(f, "cannot restore model tag: nothing stacked")
            }
        }
    }
}

// ── Fatal errors ──────────────────────────────────────────────────────────────

/// Every condition that ends in the fatal trap.
///
/// Reported exactly once through
/// [`Platform::die`](crate::platform::Platform::die).
#[derive(Debug, Clone, Error)]
pub enum FatalError {
    /// The event arena free list is empty.
    #[error("out of event memory: all {capacity} event slots are in use")]
    OutOfEventMemory { capacity: usize },

    /// The deadline queue, arena or stacks are in an impossible state.
    #[error("queue consistency violation: {0}")]
    QueueConsistencyViolation(ConsistencyFault),

    /// More nested fires than the preemption stack can record.
    #[error("preemption stack overflow: nesting exceeded {capacity}")]
    PreemptionStackOverflow { capacity: usize },

    /// The actuation arena free list is empty.
    #[error("actuation queue full: all {capacity} actuation slots are in use")]
    ActuationQueueFull { capacity: usize },

    /// An actuation was requested for a time that has already passed.
    #[error("missed deadline at {actuator}: actuation time {timestamp} is before platform time {now}")]
    MissedDeadline {
        actuator: ActuatorId,
        timestamp: Time,
        now: Time,
    },

    /// A network event arrived later than its delay bounds allow.
    #[error("event for {port} came in too late: timestamp {timestamp}, platform time {now}, bound {bound}")]
    LateNetworkEvent {
        port: PortId,
        timestamp: Time,
        now: Time,
        bound: Time,
    },
}

impl From<ConsistencyFault> for FatalError {
    fn from(fault: ConsistencyFault) -> Self {
        FatalError::QueueConsistencyViolation(fault)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
