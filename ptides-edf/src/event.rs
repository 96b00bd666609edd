/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Event records and the identifiers that route them.
//!
//! ```text
//! producer (ISR / actor / fire_at) ──► PendingEvent ──(Director::post)──► Event in arena slot
//!                                      ↑ what the producer knows            ↑ depth, offset and
//!                                                                             deadline filled in
//! ```

use std::fmt;

use crate::time::{SignedTime, Tag, Time};

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Identity of one configured actor instance.
///
/// This is the `fireMethod` capability key: the director dispatches on it, and
/// the preemption stack uses it to refuse re-entrant firing.  It identifies an
/// *instance*, so two instances of the same actor type never block each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ActorId(pub u16);

/// Global index of an actor input port (the `sinkEvent` write target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub u16);

/// Index of an actuator (output device driven by the actuation timer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActuatorId(pub u16);

/// Index of an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventHandle(pub(crate) u16);

impl EventHandle {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actuator#{}", self.0)
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Scalar token carried by an event.
///
/// `Pure` marks a self-scheduled refiring that carries no value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Payload {
    #[default]
    Pure,
    Int(i16),
    Long(i32),
    Double(f64),
    Char(i8),
    Boolean(bool),
}

impl Payload {
    /// Widen any numeric payload to `f64`; `None` for `Pure`.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Payload::Pure => None,
            Payload::Int(v) => Some(f64::from(v)),
            Payload::Long(v) => Some(f64::from(v)),
            Payload::Double(v) => Some(v),
            Payload::Char(v) => Some(f64::from(v)),
            Payload::Boolean(v) => Some(if v { 1.0 } else { 0.0 }),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Pure => write!(f, "pure"),
            Payload::Int(v) => write!(f, "{v}i16"),
            Payload::Long(v) => write!(f, "{v}i32"),
            Payload::Double(v) => write!(f, "{v}f64"),
            Payload::Char(v) => write!(f, "{v}i8"),
            Payload::Boolean(v) => write!(f, "{v}"),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────────────

/// One in-flight event, as stored in an arena slot.
///
/// Queue linkage lives in the arena slot, not here, so an `Event` is a plain
/// `Copy` value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Event {
    pub payload: Payload,
    pub tag: Tag,
    /// Static tie-break: position of the destination actor in the dependency
    /// graph (lower fires first).
    pub depth: u32,
    /// Commitment time used for EDF ordering.
    pub deadline: Time,
    /// Destination actor's worst-case latency budget.
    pub offset: SignedTime,
    /// Destination actor (the fire capability).
    pub actor: ActorId,
    /// Input port the payload is delivered to before firing; `None` for pure
    /// events.
    pub sink: Option<PortId>,
}

impl Event {
    /// `sameTag ∧ sameDestination`: the events are delivered in one firing.
    pub fn fires_with(&self, other: &Event) -> bool {
        self.tag == other.tag && self.actor == other.actor
    }
}

// ── PendingEvent ──────────────────────────────────────────────────────────────

/// Where an event came from.  Only network arrivals are checked for lateness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Produced on this platform (actor output, refiring, clock event).
    #[default]
    Local,
    /// Captured by a sensor ISR.
    Sensor,
    /// Received from another platform over a network with bounded delay.
    Network {
        network_delay: Time,
        source_platform_delay: Time,
    },
}

/// What a producer knows when it has a value ready.
///
/// The director resolves the destination actor's depth and offset from its
/// configuration and derives the deadline unless one is given explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEvent {
    pub target: Target,
    pub tag: Tag,
    pub payload: Payload,
    pub origin: Origin,
    /// Overrides the derived `timestamp − offset` deadline.
    pub deadline: Option<Time>,
}

/// Destination of a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Deliver to an input port; the destination actor is the port's owner.
    Port(PortId),
    /// Pure refiring of an actor.
    Actor(ActorId),
}

impl PendingEvent {
    /// Value for an input port at `tag`.
    pub fn to_port(port: PortId, tag: Tag, payload: Payload) -> Self {
        Self {
            target: Target::Port(port),
            tag,
            payload,
            origin: Origin::Local,
            deadline: None,
        }
    }

    /// Payload-less refiring of `actor` at `tag`.
    pub fn pure(actor: ActorId, tag: Tag) -> Self {
        Self {
            target: Target::Actor(actor),
            tag,
            payload: Payload::Pure,
            origin: Origin::Local,
            deadline: None,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_deadline(mut self, deadline: Time) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
