/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Boundary to the actor collaborator.
//!
//! The director never knows what an actor computes.  It only holds one
//! [`Actor`] per configured instance, keyed by [`ActorId`], and calls
//! [`Actor::fire`] with a [`FireContext`] through which the actor reads the
//! inputs delivered for this firing and produces new events.

use crate::director::FireContext;
use crate::error::{ConsistencyFault, FatalError};
use crate::event::{ActorId, Payload};
use crate::platform::Platform;
use crate::time::Time;

/// Fire capability of one actor instance.
pub trait Actor<P: Platform> {
    /// Human-readable instance name, for logs.
    fn name(&self) -> &str;

    /// React to the inputs delivered at `ctx.tag()`.
    ///
    /// Runs to completion; the scheduler is preemptive in selection only.
    /// Errors are fatal and end in the platform's trap.
    fn fire(&mut self, ctx: &mut FireContext<'_, P>) -> Result<(), FatalError>;
}

/// Output device driven from the actuation timer.
pub trait Actuator {
    /// Drive the output.  `at` is the model timestamp the value belongs to.
    fn actuate(&mut self, at: Time, value: Payload);
}

// ── ActorTable ────────────────────────────────────────────────────────────────

/// Installed actors, indexed by [`ActorId`].
///
/// An actor is taken out of its slot for the duration of its fire and put
/// back afterwards, which lets the fire borrow the director mutably.
pub struct ActorTable<P: Platform> {
    slots: Vec<Option<Box<dyn Actor<P>>>>,
}

impl<P: Platform> ActorTable<P> {
    pub fn with_capacity(actors: usize) -> Self {
        let mut slots = Vec::with_capacity(actors);
        slots.resize_with(actors, || None);
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Install `actor` as the fire capability of `id`, replacing any
    /// previous one.
    pub fn install(&mut self, id: ActorId, actor: Box<dyn Actor<P>>) -> Result<(), FatalError> {
        let slot = self
            .slots
            .get_mut(usize::from(id.0))
            .ok_or(ConsistencyFault::UnknownActor { actor: id })?;
        *slot = Some(actor);
        Ok(())
    }

    pub fn is_installed(&self, id: ActorId) -> bool {
        matches!(self.slots.get(usize::from(id.0)), Some(Some(_)))
    }

    /// Borrow the actor out of the table for a fire.
    ///
    /// # Errors
    /// [`ConsistencyFault::ActorMissing`] if nothing is installed (or the
    /// actor is already taken by an enclosing fire).
    pub fn take(&mut self, id: ActorId) -> Result<Box<dyn Actor<P>>, FatalError> {
        self.slots
            .get_mut(usize::from(id.0))
            .and_then(Option::take)
            .ok_or_else(|| ConsistencyFault::ActorMissing { actor: id }.into())
    }

    /// Return an actor taken with [`take`](Self::take).
    pub fn restore(&mut self, id: ActorId, actor: Box<dyn Actor<P>>) {
        if let Some(slot) = self.slots.get_mut(usize::from(id.0)) {
            *slot = Some(actor);
        }
    }
}

impl<P: Platform> std::fmt::Debug for ActorTable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.slots
                    .iter()
                    .map(|slot| slot.as_ref().map(|actor| actor.name().to_string())),
            )
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SimPlatform;

    struct Nop;

    impl Actor<SimPlatform> for Nop {
        fn name(&self) -> &str {
            "nop"
        }

        fn fire(&mut self, _ctx: &mut FireContext<'_, SimPlatform>) -> Result<(), FatalError> {
            Ok(())
        }
    }

    #[test]
    fn take_leaves_the_slot_empty_until_restored() {
        let mut table = ActorTable::<SimPlatform>::with_capacity(2);
        table.install(ActorId(1), Box::new(Nop)).unwrap();

        let actor = table.take(ActorId(1)).unwrap();
        assert!(!table.is_installed(ActorId(1)));
        assert!(matches!(
            table.take(ActorId(1)),
            Err(FatalError::QueueConsistencyViolation(ConsistencyFault::ActorMissing { .. }))
        ));

        table.restore(ActorId(1), actor);
        assert!(table.is_installed(ActorId(1)));
    }

    #[test]
    fn install_out_of_range_is_rejected() {
        let mut table = ActorTable::<SimPlatform>::with_capacity(1);
        assert!(table.install(ActorId(3), Box::new(Nop)).is_err());
        assert_eq!(table.len(), 1);
    }
}
