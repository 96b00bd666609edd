/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Ptides preemptive-EDF event scheduler
//!
//! Decides, on a single core with no operating system, which pending event to
//! fire next and when it is safe to fire it.  All memory is allocated at boot;
//! the only mutual exclusion is masking interrupts.
//!
//! ```text
//! lib.rs
//! ├── time          – Time / SignedTime / Tag arithmetic
//! ├── event         – Event record, payloads, ids, PendingEvent
//! ├── arena         – fixed event pool + free list
//! ├── queue         – deadline-ordered doubly linked queue
//! ├── preemption    – stack of executing deadlines / actors
//! ├── safe_time     – safe-to-process calculation
//! ├── actuation     – timestamp-ordered output queue
//! ├── platform/     – Platform trait, CriticalSection, sim + host clocks
//! ├── actor         – Actor / Actuator capabilities
//! ├── director/     – scheduler loop, FireContext, model-time register
//! ├── config/       – YAML director configuration
//! ├── error         – FatalError taxonomy
//! └── demo          – sample sensor → controller → motor pipeline
//! ```

pub mod actor;
pub mod actuation;
pub mod arena;
pub mod config;
pub mod demo;
pub mod director;
pub mod error;
pub mod event;
pub mod platform;
pub mod preemption;
pub mod queue;
pub mod safe_time;
pub mod time;
