/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! What an actor can do while it fires.

use super::{Director, Outcome};
use crate::error::FatalError;
use crate::event::{ActorId, ActuatorId, EventHandle, Payload, PendingEvent, PortId};
use crate::platform::Platform;
use crate::time::{Tag, Time};

/// Handle given to [`Actor::fire`](crate::actor::Actor::fire).
///
/// Lives only for the duration of one fire.  No critical section is held
/// while it exists.
pub struct FireContext<'d, P: Platform> {
    director: &'d mut Director<P>,
    actor: ActorId,
}

impl<'d, P: Platform> FireContext<'d, P> {
    pub(super) fn new(director: &'d mut Director<P>, actor: ActorId) -> Self {
        Self { director, actor }
    }

    /// The actor being fired.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Model time of this firing.
    pub fn tag(&self) -> Tag {
        self.director.model_time.current()
    }

    /// Current platform time.
    pub fn real_time(&self) -> Time {
        self.director.platform.real_time()
    }

    /// Global id of input `input` of `actor`, for wiring outputs.
    pub fn port_of(&self, actor: ActorId, input: u16) -> Option<PortId> {
        self.director.port(actor, input)
    }

    /// Read the payload delivered to input `input` for this firing.
    ///
    /// Each input can be read once; `None` if nothing was delivered, it was
    /// already read, or the actor has no such input.
    pub fn take_input(&mut self, input: u16) -> Option<Payload> {
        let port = self.director.port(self.actor, input)?;
        let slot = self.director.latches.get_mut(usize::from(port.0))?.take()?;
        Some(self.director.arena.event(slot).payload)
    }

    /// Send `payload` to `port` at the current tag.
    pub fn emit(&mut self, port: PortId, payload: Payload) -> Result<EventHandle, FatalError> {
        let tag = self.tag();
        self.director.enqueue(PendingEvent::to_port(port, tag, payload))
    }

    /// Send `payload` to `port` with a logical delay: the event carries
    /// timestamp `tag().timestamp + delay`, microstep 0.
    pub fn emit_after(
        &mut self,
        port: PortId,
        delay: Time,
        payload: Payload,
    ) -> Result<EventHandle, FatalError> {
        let tag = Tag::new(self.tag().timestamp.saturating_add(delay), 0);
        self.director.enqueue(PendingEvent::to_port(port, tag, payload))
    }

    /// Enqueue an arbitrary event.
    pub fn post(&mut self, pending: PendingEvent) -> Result<EventHandle, FatalError> {
        self.director.enqueue(pending)
    }

    /// Ask to be fired again at `time`.  At the current timestamp the
    /// refiring lands on the next microstep.
    pub fn fire_at(&mut self, time: Time) -> Result<EventHandle, FatalError> {
        self.director.schedule_refiring(self.actor, time, 0)
    }

    /// Drive `actuator` with `value` at the current model timestamp.
    pub fn actuate(&mut self, actuator: ActuatorId, value: Payload) -> Result<(), FatalError> {
        self.director.schedule_actuation(actuator, value)
    }

    /// Run a nested scheduling pass.
    ///
    /// Only events that beat this fire's deadline, and whose actor is not
    /// already executing, can start before this call returns.
    pub fn preempt(&mut self) -> Result<Outcome, FatalError> {
        self.director.run_loop()
    }
}
