/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Sample control loop driven by the director.
//!
//! ```text
//! sensor ISR ──► filter ──────┐
//!                             ├──► controller ──► motor (actuated at its timestamp)
//! setpoint clock (fire_at) ───┘
//! ```
//!
//! The filter and the setpoint clock both emit with the same logical delay,
//! so the controller receives measurement and setpoint at one tag and sees
//! them in a single firing.

use std::f64::consts::TAU;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::actor::{Actor, Actuator};
use crate::config::DirectorConfig;
use crate::director::{Director, DirectorStats, FireContext};
use crate::error::FatalError;
use crate::event::{ActorId, ActuatorId, Origin, Payload, PendingEvent, PortId};
use crate::platform::{Platform, SimPlatform};
use crate::time::{Tag, Time};

/// Configuration used when the binary is started without `--config`.
pub const DEFAULT_CONFIG_YAML: &str = r#"
director:
  max_events: 32
  max_actuation_events: 8
  selection: head_only
  missed_deadline: fatal
actors:
  - name: filter
    depth: 0
    offset_ns: 0
    inputs: 1
  - name: setpoint
    depth: 0
    offset_ns: 0
  - name: controller
    depth: 1
    offset_ns: 2000000
    inputs: 2
actuators:
  - motor
"#;

pub fn default_config() -> Result<DirectorConfig> {
    DirectorConfig::from_yaml_str(DEFAULT_CONFIG_YAML)
}

// ── Parameters and wiring ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct DemoParams {
    /// Sensor sampling and setpoint clock period.
    pub period: Time,
    /// Logical delay from sample to actuation.
    pub actuation_delay: Time,
    pub setpoint: f64,
    pub gain: f64,
    /// Weight of the newest sample in the filter's moving average.
    pub smoothing: f64,
}

impl Default for DemoParams {
    fn default() -> Self {
        Self {
            period: Time::from_millis(10),
            actuation_delay: Time::from_millis(2),
            setpoint: 1.0,
            gain: 0.8,
            smoothing: 0.5,
        }
    }
}

/// Ids the driving loop needs after installation.
#[derive(Debug, Clone, Copy)]
pub struct DemoWiring {
    pub sensor_port: PortId,
    pub setpoint: ActorId,
    pub motor: ActuatorId,
}

/// Install the demo actors and `motor` driver into `director`.
///
/// # Errors
/// If the configuration lacks one of the expected actors, ports or the
/// `motor` actuator.
pub fn install<P: Platform>(
    director: &mut Director<P>,
    params: &DemoParams,
    motor: Box<dyn Actuator>,
) -> Result<DemoWiring> {
    let lookup = |name: &str| {
        director
            .actor_id(name)
            .ok_or_else(|| anyhow!("configuration has no actor named '{name}'"))
    };
    let filter = lookup("filter")?;
    let setpoint = lookup("setpoint")?;
    let controller = lookup("controller")?;

    let input = |actor: ActorId, index: u16| {
        director
            .port(actor, index)
            .ok_or_else(|| anyhow!("{actor} needs at least {} input(s)", index + 1))
    };
    let sensor_port = input(filter, 0)?;
    let measurement = input(controller, 0)?;
    let reference = input(controller, 1)?;

    let motor_id = director
        .actuator_id("motor")
        .ok_or_else(|| anyhow!("configuration has no actuator named 'motor'"))?;

    director.install_actor(
        filter,
        Box::new(Filter {
            out: measurement,
            delay: params.actuation_delay,
            smoothing: params.smoothing,
            state: None,
        }),
    )?;
    director.install_actor(
        setpoint,
        Box::new(SetpointClock {
            out: reference,
            delay: params.actuation_delay,
            period: params.period,
            value: params.setpoint,
        }),
    )?;
    director.install_actor(
        controller,
        Box::new(Controller {
            motor: motor_id,
            gain: params.gain,
            measurement: 0.0,
            setpoint: 0.0,
        }),
    )?;
    director.install_actuator(motor_id, motor)?;

    Ok(DemoWiring {
        sensor_port,
        setpoint,
        motor: motor_id,
    })
}

// ── Actors ────────────────────────────────────────────────────────────────────

/// Exponential moving average of the raw sensor samples.
pub struct Filter {
    out: PortId,
    delay: Time,
    smoothing: f64,
    state: Option<f64>,
}

impl<P: Platform> Actor<P> for Filter {
    fn name(&self) -> &str {
        "filter"
    }

    fn fire(&mut self, ctx: &mut FireContext<'_, P>) -> Result<(), FatalError> {
        let Some(sample) = ctx.take_input(0).and_then(Payload::as_f64) else {
            return Ok(());
        };
        let smoothed = match self.state {
            Some(previous) => self.smoothing * sample + (1.0 - self.smoothing) * previous,
            None => sample,
        };
        self.state = Some(smoothed);
        ctx.emit_after(self.out, self.delay, Payload::Double(smoothed))?;
        Ok(())
    }
}

/// Periodically republishes the setpoint by refiring itself.
pub struct SetpointClock {
    out: PortId,
    delay: Time,
    period: Time,
    value: f64,
}

impl<P: Platform> Actor<P> for SetpointClock {
    fn name(&self) -> &str {
        "setpoint"
    }

    fn fire(&mut self, ctx: &mut FireContext<'_, P>) -> Result<(), FatalError> {
        ctx.emit_after(self.out, self.delay, Payload::Double(self.value))?;
        let next = ctx.tag().timestamp.saturating_add(self.period);
        ctx.fire_at(next)?;
        Ok(())
    }
}

/// Proportional controller.  Keeps the last value of each input.
pub struct Controller {
    motor: ActuatorId,
    gain: f64,
    measurement: f64,
    setpoint: f64,
}

impl<P: Platform> Actor<P> for Controller {
    fn name(&self) -> &str {
        "controller"
    }

    fn fire(&mut self, ctx: &mut FireContext<'_, P>) -> Result<(), FatalError> {
        if let Some(measurement) = ctx.take_input(0).and_then(Payload::as_f64) {
            self.measurement = measurement;
        }
        if let Some(setpoint) = ctx.take_input(1).and_then(Payload::as_f64) {
            self.setpoint = setpoint;
        }
        let command = self.gain * (self.setpoint - self.measurement);
        ctx.actuate(self.motor, Payload::Double(command))
    }
}

/// Actuator that only logs what it is told.
#[derive(Debug)]
pub struct LoggingMotor {
    name: String,
}

impl LoggingMotor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Actuator for LoggingMotor {
    fn actuate(&mut self, at: Time, value: Payload) {
        info!(actuator = %self.name, at = %at, command = %value, "motor driven");
    }
}

// ── Driving the loop ──────────────────────────────────────────────────────────

/// Simulated plant output at platform time `now`.
pub fn sensor_sample(now: Time) -> f64 {
    let t = now.as_nanos() as f64 / 1e9;
    0.6 + 0.3 * (TAU * 0.5 * t).sin()
}

/// What the sensor ISR does: timestamp a sample with the current platform
/// time and hand it to the director.
pub fn sensor_interrupt<P: Platform>(director: &mut Director<P>, wiring: &DemoWiring) {
    let now = director.platform().real_time();
    director.post(
        PendingEvent::to_port(
            wiring.sensor_port,
            Tag::new(now, 0),
            Payload::Double(sensor_sample(now)),
        )
        .with_origin(Origin::Sensor),
    );
}

/// Run the loop on a virtual clock, jumping straight to the next sensor
/// sample or armed timer, until platform time would pass `until`.
///
/// Pending interrupts are serviced sensor first, then the safe-to-process
/// timer, then the actuation timer.
pub fn run_simulated(
    director: &mut Director<SimPlatform>,
    wiring: &DemoWiring,
    period: Time,
    until: Time,
) -> DirectorStats {
    let start = director.platform().real_time();
    director.post(PendingEvent::pure(wiring.setpoint, Tag::new(start, 0)));
    let mut next_sample = start;

    loop {
        let platform = director.platform();
        let next = [
            Some(next_sample),
            platform.armed_timer(),
            platform.armed_actuation(),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(next_sample);
        if next > until {
            break;
        }
        platform.advance_to(next);

        if next_sample <= next {
            sensor_interrupt(director, wiring);
            director.process_events();
            next_sample = next_sample.saturating_add(period);
        }
        if director.platform().take_expired_timer().is_some() {
            director.on_timer_interrupt();
        }
        if director
            .platform()
            .armed_actuation()
            .is_some_and(|at| at <= next)
        {
            director.on_actuation_interrupt();
        }
    }

    director.stats()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
