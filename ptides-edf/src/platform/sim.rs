/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministic simulated platform.
//!
//! Time only moves when the caller advances it, so scheduling decisions are
//! reproducible.  Every armed timer value is recorded for inspection, and
//! `die` panics with the fatal error's message after logging it.

use std::cell::{Cell, RefCell};

use tracing::{debug, error};

use super::Platform;
use crate::error::FatalError;
use crate::time::Time;

#[derive(Debug, Default)]
pub struct SimPlatform {
    now: Cell<Time>,
    timer: Cell<Option<Time>>,
    actuation_timer: Cell<Option<Time>>,
    armed_history: RefCell<Vec<Time>>,
    mask_depth: Cell<u32>,
    critical_sections: Cell<u64>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Time) -> Self {
        let platform = Self::default();
        platform.now.set(now);
        platform
    }

    /// Jump the clock to `now`.  Going backwards is allowed for tests.
    pub fn set_time(&self, now: Time) {
        self.now.set(now);
    }

    /// Move the clock forward to `at` (no-op if `at` is in the past).
    pub fn advance_to(&self, at: Time) {
        if at > self.now.get() {
            self.now.set(at);
        }
    }

    /// Currently armed safe-to-process timer.
    pub fn armed_timer(&self) -> Option<Time> {
        self.timer.get()
    }

    /// Take the armed timer if it has expired, as the timer ISR would.
    pub fn take_expired_timer(&self) -> Option<Time> {
        match self.timer.get() {
            Some(at) if at <= self.now.get() => {
                self.timer.set(None);
                Some(at)
            }
            _ => None,
        }
    }

    pub fn armed_actuation(&self) -> Option<Time> {
        self.actuation_timer.get()
    }

    /// Every value passed to `set_timed_interrupt`, oldest first.
    pub fn armed_history(&self) -> Vec<Time> {
        self.armed_history.borrow().clone()
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.mask_depth.get() == 0
    }

    /// Number of `disable_interrupts` calls so far, nested ones included.
    pub fn critical_sections(&self) -> u64 {
        self.critical_sections.get()
    }
}

impl Platform for SimPlatform {
    fn real_time(&self) -> Time {
        self.now.get()
    }

    fn set_timed_interrupt(&self, at: Time) {
        debug!(at = %at, "sim: safe-to-process timer armed");
        self.timer.set(Some(at));
        self.armed_history.borrow_mut().push(at);
    }

    fn disarm_timed_interrupt(&self) {
        self.timer.set(None);
    }

    fn set_actuation_interrupt(&self, at: Option<Time>) {
        self.actuation_timer.set(at);
    }

    fn disable_interrupts(&self) {
        self.mask_depth.set(self.mask_depth.get() + 1);
        self.critical_sections.set(self.critical_sections.get() + 1);
    }

    fn enable_interrupts(&self) {
        let depth = self.mask_depth.get();
        debug_assert!(depth > 0, "enable_interrupts without matching disable");
        self.mask_depth.set(depth.saturating_sub(1));
    }

    fn die(&self, error: &FatalError) -> ! {
        error!(%error, "fatal trap");
        panic!("fatal trap: {error}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_forward_with_advance() {
        let p = SimPlatform::starting_at(Time::from_secs(5));
        p.advance_to(Time::from_secs(3));
        assert_eq!(p.real_time(), Time::from_secs(5));
        p.advance_to(Time::from_secs(8));
        assert_eq!(p.real_time(), Time::from_secs(8));
    }

    #[test]
    fn expired_timer_is_taken_once() {
        let p = SimPlatform::new();
        p.set_timed_interrupt(Time::from_secs(2));
        assert_eq!(p.take_expired_timer(), None);
        p.advance_to(Time::from_secs(2));
        assert_eq!(p.take_expired_timer(), Some(Time::from_secs(2)));
        assert_eq!(p.take_expired_timer(), None);
        assert_eq!(p.armed_history(), vec![Time::from_secs(2)]);
    }

    #[test]
    fn disarmed_timer_never_expires() {
        let p = SimPlatform::new();
        p.set_timed_interrupt(Time::from_secs(1));
        p.disarm_timed_interrupt();
        p.advance_to(Time::from_secs(5));
        assert_eq!(p.armed_timer(), None);
        assert_eq!(p.take_expired_timer(), None);
    }

    #[test]
    #[should_panic(expected = "fatal trap: out of event memory")]
    fn die_panics_with_the_error() {
        SimPlatform::new().die(&FatalError::OutOfEventMemory { capacity: 1 });
    }
}
