/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Model-time register.
//!
//! Holds the logical tag the currently executing actor observes.  Entering a
//! fire saves the outer tag and installs the event's; leaving it restores the
//! outer one, so a nested fire started from within another sees its own tag
//! and the outer fire sees its tag again once the nested one returns.

use crate::error::{ConsistencyFault, FatalError};
use crate::time::Tag;

#[derive(Debug)]
pub struct ModelTimeRegister {
    current: Tag,
    saved: Box<[Tag]>,
    depth: usize,
}

impl ModelTimeRegister {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            current: Tag::default(),
            saved: vec![Tag::default(); capacity].into_boxed_slice(),
            depth: 0,
        }
    }

    pub fn current(&self) -> Tag {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Save the current tag and make `tag` current.
    pub fn enter(&mut self, tag: Tag) -> Result<(), FatalError> {
        let capacity = self.saved.len();
        let slot = self
            .saved
            .get_mut(self.depth)
            .ok_or(FatalError::PreemptionStackOverflow { capacity })?;
        *slot = self.current;
        self.depth += 1;
        self.current = tag;
        Ok(())
    }

    /// Restore the tag saved by the matching [`enter`](Self::enter).
    pub fn leave(&mut self) -> Result<(), FatalError> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or(ConsistencyFault::ModelTagUnderflow)?;
        self.current = self.saved[self.depth];
        Ok(())
    }

    pub fn clear(&mut self) {
        self.current = Tag::default();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Time;

    fn tag(secs: u32, micro: u16) -> Tag {
        Tag::new(Time::from_secs(secs), micro)
    }

    #[test]
    fn nested_enter_restores_outer_tag() {
        let mut reg = ModelTimeRegister::with_capacity(2);
        reg.enter(tag(5, 0)).unwrap();
        reg.enter(tag(3, 1)).unwrap();
        assert_eq!(reg.current(), tag(3, 1));
        reg.leave().unwrap();
        assert_eq!(reg.current(), tag(5, 0));
        reg.leave().unwrap();
        assert_eq!(reg.current(), Tag::default());
    }

    #[test]
    fn leave_without_enter_is_a_fault() {
        let mut reg = ModelTimeRegister::with_capacity(1);
        assert!(matches!(
            reg.leave(),
            Err(FatalError::QueueConsistencyViolation(
                ConsistencyFault::ModelTagUnderflow
            ))
        ));
    }

    #[test]
    fn enter_beyond_capacity_overflows() {
        let mut reg = ModelTimeRegister::with_capacity(1);
        reg.enter(tag(1, 0)).unwrap();
        assert!(reg.enter(tag(2, 0)).is_err());
        assert_eq!(reg.current(), tag(1, 0));
    }
}
