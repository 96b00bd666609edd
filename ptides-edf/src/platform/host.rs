/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Wall-clock platform for running the director on a hosted OS.
//!
//! Platform time is the monotonic time elapsed since
//! [`initialize_time_base`](Platform::initialize_time_base).  There are no
//! real interrupts: the timers are just remembered, and the driving loop
//! (the binary's `--realtime` mode) sleeps until the earliest of them.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::Platform;
use crate::error::FatalError;
use crate::time::Time;

#[derive(Debug)]
pub struct HostPlatform {
    epoch: Cell<Instant>,
    timer: Cell<Option<Time>>,
    actuation_timer: Cell<Option<Time>>,
    mask_depth: Cell<u32>,
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPlatform {
    pub fn new() -> Self {
        Self {
            epoch: Cell::new(Instant::now()),
            timer: Cell::new(None),
            actuation_timer: Cell::new(None),
            mask_depth: Cell::new(0),
        }
    }

    /// Earliest pending timer (safe-to-process or actuation), if any.
    pub fn next_wakeup(&self) -> Option<Time> {
        match (self.timer.get(), self.actuation_timer.get()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Wall-clock duration from now until platform time `at` (zero if past).
    pub fn duration_until(&self, at: Time) -> Duration {
        let now = self.real_time();
        Duration::from_nanos(at.saturating_sub(now).as_nanos())
    }

    /// Take the safe-to-process timer if it has expired.
    pub fn take_expired_timer(&self) -> Option<Time> {
        let now = self.real_time();
        match self.timer.get() {
            Some(at) if at <= now => {
                self.timer.set(None);
                Some(at)
            }
            _ => None,
        }
    }

    /// Whether the actuation timer has expired.  The director re-arms it.
    pub fn actuation_due(&self) -> bool {
        matches!(self.actuation_timer.get(), Some(at) if at <= self.real_time())
    }
}

impl Platform for HostPlatform {
    fn real_time(&self) -> Time {
        let elapsed = self.epoch.get().elapsed();
        Time::from_nanos(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
    }

    fn set_timed_interrupt(&self, at: Time) {
        debug!(at = %at, "host: safe-to-process timer armed");
        self.timer.set(Some(at));
    }

    fn disarm_timed_interrupt(&self) {
        self.timer.set(None);
    }

    fn set_actuation_interrupt(&self, at: Option<Time>) {
        self.actuation_timer.set(at);
    }

    fn disable_interrupts(&self) {
        self.mask_depth.set(self.mask_depth.get() + 1);
    }

    fn enable_interrupts(&self) {
        self.mask_depth.set(self.mask_depth.get().saturating_sub(1));
    }

    fn initialize_time_base(&self) {
        self.epoch.set(Instant::now());
        self.timer.set(None);
        self.actuation_timer.set(None);
    }

    fn die(&self, error: &FatalError) -> ! {
        error!(%error, "fatal trap");
        std::process::exit(1);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
