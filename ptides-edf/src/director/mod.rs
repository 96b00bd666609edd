//! Preemptive-EDF director.
//!
//! [`Director`] owns the event arena, the deadline queue, the preemption
//! stack, the model-time register and the actuation queue, and runs the
//! scheduler loop over them:
//!
//! ```text
//!            ┌──────────── fire returned ────────────┐
//!            ▼                                       │
//! Idle ──► Evaluating ──head safe, may preempt──► Firing
//!  ▲          │
//!  │          ├── queue empty ─────────────────────► Outcome::Idle
//!  │          ├── head may not preempt ────────────► Outcome::Blocked
//!  │          └── head not yet safe ─► arm timer ──► Outcome::Suspended
//!  └── timer / sensor interrupt ◄─────────────────────────────┘
//! ```
//!
//! # Boundaries
//!
//! | Concern | Where |
//! |---|---|
//! | Mutual exclusion with ISR producers | [`CriticalSection`] around allocate / insert / remove / release |
//! | Fatal conditions | Building blocks return `Result<_, FatalError>`; the public entry points below hand an `Err` to [`Platform::die`] once |
//! | Payload handoff | Per-port input latches, filled during group removal, read once through [`FireContext::take_input`] |
//! | Nested scheduling | [`FireContext::preempt`] re-enters the loop; the preemption stack decides what may run |
//!
//! # Example
//! ```rust,ignore
//! let mut director = Director::new(SimPlatform::new(), &config)?;
//! let sensor = director.actor_id("sensor").unwrap();
//! director.install_actor(sensor, Box::new(my_sensor))?;
//! director.post(PendingEvent::pure(sensor, Tag::new(Time::ZERO, 0)));
//! let outcome = director.process_events();
//! ```

mod context;
pub mod model_time;

pub use context::FireContext;
pub use model_time::ModelTimeRegister;

use tracing::{debug, info, trace, warn};

use crate::actor::{Actor, ActorTable, Actuator};
use crate::actuation::{Actuation, ActuationQueue};
use crate::arena::EventArena;
use crate::config::{ConfigError, DirectorConfig, MissedDeadlinePolicy, SelectionPolicy};
use crate::error::{ConsistencyFault, FatalError};
use crate::event::{
    ActorId, ActuatorId, Event, EventHandle, Origin, Payload, PendingEvent, PortId, Target,
};
use crate::platform::{CriticalSection, Platform};
use crate::preemption::PreemptionStack;
use crate::queue::DeadlineQueue;
use crate::safe_time::{offset_time, safe_to_process};
use crate::time::{SignedTime, Tag, Time};

// ── Public result types ───────────────────────────────────────────────────────

/// Why a scheduling pass returned control to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing is queued.
    Idle,
    /// The next candidate may not preempt the fire in progress.
    Blocked,
    /// The safe-to-process timer is armed; nothing can run before `wake_at`.
    Suspended { wake_at: Time },
}

/// Counters for the binary's summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorStats {
    /// Actor fire invocations.
    pub fired: u64,
    /// Events delivered alongside the lead event of their group.
    pub groups_merged: u64,
    /// Calls that actually re-armed the safe-to-process timer.
    pub timers_armed: u64,
    pub actuations: u64,
}

// ── Internal state types ──────────────────────────────────────────────────────

/// Static description of a configured actor instance.
#[derive(Debug, Clone)]
struct ActorSpec {
    name: String,
    depth: u32,
    offset: SignedTime,
    first_port: u16,
    inputs: u16,
}

struct ActuatorSlot {
    name: String,
    driver: Option<Box<dyn Actuator>>,
}

/// Result of one pass over the queue.
enum Selection {
    Ready(EventHandle),
    Done(Outcome),
}

// ── Director ──────────────────────────────────────────────────────────────────

pub struct Director<P: Platform> {
    platform: P,
    arena: EventArena,
    queue: DeadlineQueue,
    stack: PreemptionStack,
    model_time: ModelTimeRegister,
    /// Input port → slot whose payload is waiting to be read.
    latches: Box<[Option<EventHandle>]>,
    actuation: ActuationQueue,
    actuators: Vec<ActuatorSlot>,
    actors: ActorTable<P>,
    specs: Vec<ActorSpec>,
    port_owner: Box<[ActorId]>,
    /// Earliest safe-to-process time the hardware timer is armed for.
    armed: Option<Time>,
    selection: SelectionPolicy,
    missed_deadline: MissedDeadlinePolicy,
    clock_sync_error_bound: Time,
    stats: DirectorStats,
}

impl<P: Platform> Director<P> {
    /// Build a director for `config` on `platform` and start its time base.
    ///
    /// All memory the scheduler will ever use is allocated here.
    pub fn new(platform: P, config: &DirectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut specs = Vec::with_capacity(config.actors.len());
        let mut port_owner = Vec::with_capacity(config.port_count());
        for (index, actor) in config.actors.iter().enumerate() {
            let id = ActorId(index as u16);
            specs.push(ActorSpec {
                name: actor.name.clone(),
                depth: actor.depth,
                offset: actor.offset,
                first_port: port_owner.len() as u16,
                inputs: actor.inputs,
            });
            port_owner.extend(std::iter::repeat(id).take(usize::from(actor.inputs)));
        }

        let actuators = config
            .actuators
            .iter()
            .map(|name| ActuatorSlot {
                name: name.clone(),
                driver: None,
            })
            .collect();

        platform.initialize_time_base();

        info!(
            actors = specs.len(),
            ports = port_owner.len(),
            actuators = config.actuators.len(),
            max_events = config.max_events,
            selection = ?config.selection,
            "director initialised"
        );

        Ok(Self {
            arena: EventArena::with_capacity(config.max_events),
            queue: DeadlineQueue::new(),
            stack: PreemptionStack::with_capacity(config.max_events),
            model_time: ModelTimeRegister::with_capacity(config.max_events),
            latches: vec![None; port_owner.len()].into_boxed_slice(),
            actuation: ActuationQueue::with_capacity(config.max_actuation_events),
            actuators,
            actors: ActorTable::with_capacity(specs.len()),
            specs,
            port_owner: port_owner.into_boxed_slice(),
            armed: None,
            selection: config.selection,
            missed_deadline: config.missed_deadline,
            clock_sync_error_bound: config.clock_sync_error_bound,
            stats: DirectorStats::default(),
            platform,
        })
    }

    /// Return every slot to the free list and empty both queues, both stacks
    /// and all latches, then restart the time base.
    pub fn reset(&mut self) {
        {
            let _cs = CriticalSection::enter(&self.platform);
            self.arena.reset();
            self.queue.clear();
            self.stack.clear();
            self.model_time.clear();
            self.latches.fill(None);
            self.actuation.clear();
        }
        self.armed = None;
        self.stats = DirectorStats::default();
        self.platform.initialize_time_base();
        self.platform.disarm_timed_interrupt();
        self.platform.set_actuation_interrupt(None);
        info!(capacity = self.arena.capacity(), "director reset");
    }

    // ── Wiring ────────────────────────────────────────────────────────────────

    pub fn actor_id(&self, name: &str) -> Option<ActorId> {
        self.specs
            .iter()
            .position(|spec| spec.name == name)
            .map(|index| ActorId(index as u16))
    }

    pub fn actor_name(&self, actor: ActorId) -> Option<&str> {
        self.specs.get(usize::from(actor.0)).map(|spec| spec.name.as_str())
    }

    /// Global id of input `input` of `actor`.
    pub fn port(&self, actor: ActorId, input: u16) -> Option<PortId> {
        let spec = self.specs.get(usize::from(actor.0))?;
        (input < spec.inputs).then(|| PortId(spec.first_port + input))
    }

    pub fn actuator_id(&self, name: &str) -> Option<ActuatorId> {
        self.actuators
            .iter()
            .position(|slot| slot.name == name)
            .map(|index| ActuatorId(index as u16))
    }

    pub fn install_actor(&mut self, id: ActorId, actor: Box<dyn Actor<P>>) -> Result<(), FatalError> {
        debug!(actor = %id, name = actor.name(), "actor installed");
        self.actors.install(id, actor)
    }

    pub fn install_actuator(
        &mut self,
        id: ActuatorId,
        driver: Box<dyn Actuator>,
    ) -> Result<(), FatalError> {
        let slot = self
            .actuators
            .get_mut(usize::from(id.0))
            .ok_or(ConsistencyFault::UnknownActuator { actuator: id })?;
        slot.driver = Some(driver);
        Ok(())
    }

    // ── Producer entry points ─────────────────────────────────────────────────

    /// Allocate, stamp and enqueue an event.  Called from ISRs and the
    /// foreground alike.  Any fatal condition ends in [`Platform::die`].
    pub fn post(&mut self, pending: PendingEvent) -> EventHandle {
        let result = self.enqueue(pending);
        self.trap(result)
    }

    /// Request a pure refiring of `actor` at `(time, microstep)`.
    pub fn fire_at(&mut self, actor: ActorId, time: Time, microstep: u16) -> EventHandle {
        let result = self.schedule_refiring(actor, time, microstep);
        self.trap(result)
    }

    // ── Scheduler entry points ────────────────────────────────────────────────

    /// Run the scheduler loop until nothing more can be fired right now.
    pub fn process_events(&mut self) -> Outcome {
        let result = self.run_loop();
        self.trap(result)
    }

    /// Safe-to-process timer ISR: the armed time has been reached.
    pub fn on_timer_interrupt(&mut self) -> Outcome {
        trace!(armed = ?self.armed, "timer interrupt");
        self.armed = None;
        self.process_events()
    }

    /// Actuation timer ISR: drive every output whose time has come and
    /// re-arm for the next one.
    pub fn on_actuation_interrupt(&mut self) {
        let now = self.platform.real_time();
        loop {
            let due = {
                let _cs = CriticalSection::enter(&self.platform);
                self.actuation.pop_due(now)
            };
            match due {
                Some(actuation) => self.perform(actuation),
                None => break,
            }
        }
        let next = self.actuation.peek_time();
        self.platform.set_actuation_interrupt(next);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Tag exposed to the executing actor.
    pub fn model_time(&self) -> Tag {
        self.model_time.current()
    }

    pub fn stats(&self) -> DirectorStats {
        self.stats
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    pub fn free_len(&self) -> usize {
        self.arena.free_len()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_actuations(&self) -> usize {
        self.actuation.len()
    }

    pub fn armed_timer(&self) -> Option<Time> {
        self.armed
    }

    /// Copies of the queued events, head first.
    pub fn queued_events(&self) -> Vec<Event> {
        self.queue
            .iter(&self.arena)
            .map(|handle| *self.arena.event(handle))
            .collect()
    }

    /// Walk the queue and check slot conservation.
    ///
    /// Slots of a group being fired are neither free nor queued, so the
    /// conservation count is only checked when no fire is in progress.
    pub fn check_invariants(&self) -> Result<(), FatalError> {
        self.queue.check_consistency(&self.arena)?;
        let (free, queued, capacity) =
            (self.arena.free_len(), self.queue.len(), self.arena.capacity());
        if self.stack.is_empty() && free + queued != capacity {
            return Err(ConsistencyFault::SlotsLeaked {
                free,
                queued,
                capacity,
            }
            .into());
        }
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn trap<T>(&self, result: Result<T, FatalError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.platform.die(&error),
        }
    }

    pub(crate) fn enqueue(&mut self, pending: PendingEvent) -> Result<EventHandle, FatalError> {
        let (actor, sink) = match pending.target {
            Target::Port(port) => {
                let owner = self
                    .port_owner
                    .get(usize::from(port.0))
                    .copied()
                    .ok_or(ConsistencyFault::UnknownPort { port })?;
                (owner, Some(port))
            }
            Target::Actor(actor) => (actor, None),
        };
        let spec = self
            .specs
            .get(usize::from(actor.0))
            .ok_or(ConsistencyFault::UnknownActor { actor })?;
        let (depth, offset) = (spec.depth, spec.offset);

        if let (
            Origin::Network {
                network_delay,
                source_platform_delay,
            },
            Some(port),
        ) = (pending.origin, sink)
        {
            self.check_network_arrival(
                port,
                pending.tag.timestamp,
                network_delay.saturating_add(source_platform_delay),
            )?;
        }

        let event = Event {
            payload: pending.payload,
            tag: pending.tag,
            depth,
            deadline: pending
                .deadline
                .unwrap_or_else(|| offset_time(pending.tag.timestamp, offset)),
            offset,
            actor,
            sink,
        };

        let _cs = CriticalSection::enter(&self.platform);
        let handle = self.arena.allocate()?;
        *self.arena.event_mut(handle) = event;
        self.queue.insert(&mut self.arena, handle)?;
        Ok(handle)
    }

    /// A network event is too late once more time has passed since its
    /// timestamp than the path's delays and the clock sync error can explain.
    fn check_network_arrival(
        &self,
        port: PortId,
        timestamp: Time,
        delays: Time,
    ) -> Result<(), FatalError> {
        let now = self.platform.real_time();
        let bound = delays.saturating_add(self.clock_sync_error_bound);
        if now.saturating_sub(timestamp) > bound {
            return Err(FatalError::LateNetworkEvent {
                port,
                timestamp,
                now,
                bound,
            });
        }
        Ok(())
    }

    pub(crate) fn schedule_refiring(
        &mut self,
        actor: ActorId,
        time: Time,
        microstep: u16,
    ) -> Result<EventHandle, FatalError> {
        let current = self.model_time.current();
        let firing = self.model_time.depth() > 0;
        let microstep = if firing && time == current.timestamp && microstep <= current.microstep {
            current.microstep.saturating_add(1)
        } else {
            microstep
        };
        self.enqueue(PendingEvent::pure(actor, Tag::new(time, microstep)))
    }

    pub(crate) fn run_loop(&mut self) -> Result<Outcome, FatalError> {
        loop {
            match self.select() {
                Selection::Ready(lead) => self.fire(lead)?,
                Selection::Done(outcome) => return Ok(outcome),
            }
        }
    }

    fn select(&mut self) -> Selection {
        let mut cursor = None;
        let mut suspended = false;
        loop {
            let candidate = {
                let _cs = CriticalSection::enter(&self.platform);
                self.queue
                    .peek_after(&self.arena, cursor)
                    .map(|handle| (handle, *self.arena.event(handle)))
            };
            let Some((handle, event)) = candidate else {
                return Selection::Done(self.suspended_or(suspended, Outcome::Idle));
            };

            if !self.stack.higher_priority(event.deadline, event.actor) {
                trace!(
                    actor = %event.actor,
                    deadline = %event.deadline,
                    stack_depth = self.stack.depth(),
                    "candidate may not preempt"
                );
                return Selection::Done(self.suspended_or(suspended, Outcome::Blocked));
            }

            let safe = safe_to_process(&event);
            let now = self.platform.real_time();
            if now >= safe {
                return Selection::Ready(handle);
            }

            self.arm_timer(safe, now);
            suspended = true;
            match self.selection {
                SelectionPolicy::HeadOnly => {
                    return Selection::Done(self.suspended_or(true, Outcome::Idle))
                }
                SelectionPolicy::ScanQueue => cursor = Some(handle),
            }
        }
    }

    fn suspended_or(&self, suspended: bool, otherwise: Outcome) -> Outcome {
        match (suspended, self.armed) {
            (true, Some(wake_at)) => Outcome::Suspended { wake_at },
            _ => otherwise,
        }
    }

    /// Arm the hardware timer unless it is already armed for an earlier,
    /// still pending time.
    fn arm_timer(&mut self, safe: Time, now: Time) {
        if let Some(armed) = self.armed {
            if armed <= safe && armed > now {
                trace!(armed = %armed, safe = %safe, "timer already armed earlier");
                return;
            }
        }
        self.armed = Some(safe);
        self.stats.timers_armed += 1;
        self.platform.set_timed_interrupt(safe);
        debug!(safe = %safe, now = %now, "suspended until safe to process");
    }

    fn fire(&mut self, lead: EventHandle) -> Result<(), FatalError> {
        let event = *self.arena.event(lead);
        self.stack.push(event.deadline, event.actor)?;
        self.model_time.enter(event.tag)?;

        let run = {
            let _cs = CriticalSection::enter(&self.platform);
            let latches = &mut self.latches;
            self.queue.remove_group(&mut self.arena, lead, |slot, delivered| {
                let Some(port) = delivered.sink else { return };
                if let Some(latch) = latches.get_mut(usize::from(port.0)) {
                    if let Some(unread) = latch.replace(slot) {
                        warn!(port = %port, unread = %unread, "input overwritten before it was read");
                    }
                }
            })?
        };

        self.stats.fired += 1;
        self.stats.groups_merged += (run.len - 1) as u64;
        debug!(
            actor = self.actor_name(event.actor).unwrap_or("?"),
            tag = %event.tag,
            deadline = %event.deadline,
            inputs = run.len,
            nesting = self.stack.depth(),
            "firing"
        );

        let mut actor = self.actors.take(event.actor)?;
        let fired = actor.fire(&mut FireContext::new(self, event.actor));
        self.actors.restore(event.actor, actor);
        fired?;

        for slot in self.arena.run_handles(run) {
            let Some(port) = self.arena.event(slot).sink else {
                continue;
            };
            if let Some(latch) = self.latches.get_mut(usize::from(port.0)) {
                if *latch == Some(slot) {
                    *latch = None;
                }
            }
        }

        self.model_time.leave()?;
        self.stack.pop()?;

        let _cs = CriticalSection::enter(&self.platform);
        self.arena.release_run(run)
    }

    pub(crate) fn schedule_actuation(
        &mut self,
        actuator: ActuatorId,
        value: Payload,
    ) -> Result<(), FatalError> {
        if usize::from(actuator.0) >= self.actuators.len() {
            return Err(ConsistencyFault::UnknownActuator { actuator }.into());
        }
        let at = self.model_time.current().timestamp;
        let now = self.platform.real_time();
        let actuation = Actuation {
            at,
            actuator,
            value,
        };

        if at < now {
            match self.missed_deadline {
                MissedDeadlinePolicy::Fatal => {
                    return Err(FatalError::MissedDeadline {
                        actuator,
                        timestamp: at,
                        now,
                    })
                }
                MissedDeadlinePolicy::ActuateLate => {
                    warn!(actuator = %actuator, at = %at, now = %now, "missed deadline, actuating late");
                    self.perform(actuation);
                    return Ok(());
                }
            }
        }

        let became_head = {
            let _cs = CriticalSection::enter(&self.platform);
            self.actuation.schedule(actuation)?
        };
        if became_head {
            self.platform.set_actuation_interrupt(Some(at));
        }
        Ok(())
    }

    fn perform(&mut self, actuation: Actuation) {
        let Some(slot) = self.actuators.get_mut(usize::from(actuation.actuator.0)) else {
            warn!(actuator = %actuation.actuator, "dropping actuation for unknown actuator");
            return;
        };
        match slot.driver.as_mut() {
            Some(driver) => driver.actuate(actuation.at, actuation.value),
            None => info!(
                actuator = %slot.name,
                at = %actuation.at,
                value = %actuation.value,
                "actuation (no driver installed)"
            ),
        }
        self.stats.actuations += 1;
        debug!(actuator = %slot.name, at = %actuation.at, value = %actuation.value, "actuated");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
