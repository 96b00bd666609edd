/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deadlines and identities of the fires currently in progress.
//!
//! Index `0` is the outermost fire, `depth() - 1` the innermost.  The stack is
//! what makes the scheduler preemptive in *selection*: a nested scheduling
//! pass may only start an event that beats the innermost executing deadline
//! and whose actor is not already executing.

use tracing::trace;

use crate::error::{ConsistencyFault, FatalError};
use crate::event::ActorId;
use crate::time::Time;

#[derive(Debug)]
pub struct PreemptionStack {
    deadlines: Box<[Time]>,
    actors: Box<[ActorId]>,
    depth: usize,
}

impl PreemptionStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            deadlines: vec![Time::ZERO; capacity].into_boxed_slice(),
            actors: vec![ActorId::default(); capacity].into_boxed_slice(),
            depth: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.deadlines.len()
    }

    /// Current nesting depth of started-but-unfinished fires.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Deadline of the innermost executing fire.
    pub fn top_deadline(&self) -> Option<Time> {
        self.depth.checked_sub(1).map(|top| self.deadlines[top])
    }

    /// Whether `actor` has a fire in progress at any nesting level.
    pub fn contains(&self, actor: ActorId) -> bool {
        self.actors[..self.depth].contains(&actor)
    }

    /// `higherPriority`: may an event with this deadline, destined for
    /// `actor`, start now?
    ///
    /// * empty stack → yes
    /// * innermost deadline strictly earlier than `deadline` → no
    /// * `actor` already executing at any level → no
    pub fn higher_priority(&self, deadline: Time, actor: ActorId) -> bool {
        match self.top_deadline() {
            None => true,
            Some(top) if top < deadline => false,
            Some(_) => !self.contains(actor),
        }
    }

    /// Record a fire that is about to start.
    ///
    /// # Errors
    /// [`FatalError::PreemptionStackOverflow`] when already at capacity.
    pub fn push(&mut self, deadline: Time, actor: ActorId) -> Result<(), FatalError> {
        if self.depth == self.capacity() {
            return Err(FatalError::PreemptionStackOverflow {
                capacity: self.capacity(),
            });
        }
        self.deadlines[self.depth] = deadline;
        self.actors[self.depth] = actor;
        self.depth += 1;
        trace!(actor = %actor, deadline = %deadline, depth = self.depth, "priority stacked");
        Ok(())
    }

    /// Forget the innermost fire.
    pub fn pop(&mut self) -> Result<(), FatalError> {
        if self.depth == 0 {
            return Err(ConsistencyFault::StackUnderflow.into());
        }
        self.depth -= 1;
        trace!(depth = self.depth, "priority unstacked");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.depth = 0;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
