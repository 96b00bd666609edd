/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Boundary to the hardware / platform collaborator.
//!
//! ```text
//! platform/
//! ├── mod.rs   – Platform trait, CriticalSection guard
//! ├── sim.rs   – deterministic virtual clock (tests, demo)
//! └── host.rs  – wall clock on a hosted OS (demo --realtime)
//! ```
//!
//! All methods take `&self`: on a microcontroller they write peripheral
//! registers, and the hosted implementations use interior mutability.

pub mod host;
pub mod sim;

pub use host::HostPlatform;
pub use sim::SimPlatform;

use crate::error::FatalError;
use crate::time::Time;

/// Timer, clock, interrupt mask and fatal trap of the target.
pub trait Platform {
    /// `getRealTime`: current platform (physical) time.
    fn real_time(&self) -> Time;

    /// Arm the one-shot safe-to-process timer for `at`.  Replaces any
    /// previously armed value.  A time already in the past fires at once.
    fn set_timed_interrupt(&self, at: Time);

    /// Cancel the safe-to-process timer, if armed.
    fn disarm_timed_interrupt(&self);

    /// Arm the actuation timer for `at`, or disable it with `None`.
    fn set_actuation_interrupt(&self, at: Option<Time>);

    /// Mask timer and sensor interrupts.
    ///
    /// Calls nest: implementations count them and only unmask when the
    /// matching number of [`enable_interrupts`](Self::enable_interrupts)
    /// calls has been made.
    fn disable_interrupts(&self);

    fn enable_interrupts(&self);

    /// `initializeTimeBase`: start the platform clock at boot.
    fn initialize_time_base(&self) {}

    /// Fatal trap.  Never returns.
    fn die(&self, error: &FatalError) -> !;
}

/// Interrupts masked for the lifetime of the guard.
///
/// The only mutual exclusion between the scheduler loop and ISR producers.
/// Never held across an actor's `fire`.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct CriticalSection<'p, P: Platform + ?Sized> {
    platform: &'p P,
}

impl<'p, P: Platform + ?Sized> CriticalSection<'p, P> {
    pub fn enter(platform: &'p P) -> Self {
        platform.disable_interrupts();
        Self { platform }
    }
}

impl<P: Platform + ?Sized> Drop for CriticalSection<'_, P> {
    fn drop(&mut self) {
        self.platform.enable_interrupts();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
