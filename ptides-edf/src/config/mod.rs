//! Director configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! director:
//!   max_events: 120
//!   max_actuation_events: 16
//!   clock_sync_error_bound_ns: 0
//!   selection: head_only        # head_only | scan_queue
//!   missed_deadline: fatal      # fatal | actuate_late
//! actors:
//!   - name: sensor
//!     depth: 0
//!     offset_ns: 0
//!     inputs: 0
//!   - name: controller
//!     depth: 1
//!     offset_ns: 2000000
//!     inputs: 2
//! actuators:
//!   - motor
//! ```
//!
//! Actor and port ids are assigned in list order: the first actor is
//! `actor#0`, and its inputs take the lowest global port numbers.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::arena::MAX_ARENA_CAPACITY;
use crate::time::{SignedTime, Time};

// ── Policies ──────────────────────────────────────────────────────────────────

/// What the scheduler does when the event it looked at is not yet safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Arm the timer for the head and suspend.
    #[default]
    HeadOnly,
    /// Arm the timer, then keep looking at later events in deadline order
    /// for one that is already safe.
    ScanQueue,
}

/// What happens to an actuation whose timestamp has already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissedDeadlinePolicy {
    /// Fatal trap.
    #[default]
    Fatal,
    /// Log it and drive the output immediately.
    ActuateLate,
}

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DirectorConfigFile {
    #[serde(default)]
    director: DirectorSection,
    #[serde(default)]
    actors: Vec<ActorEntry>,
    #[serde(default)]
    actuators: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DirectorSection {
    #[serde(default = "default_max_events")]
    max_events: usize,
    #[serde(default = "default_max_actuation_events")]
    max_actuation_events: usize,
    #[serde(default)]
    clock_sync_error_bound_ns: u64,
    #[serde(default)]
    selection: SelectionPolicy,
    #[serde(default)]
    missed_deadline: MissedDeadlinePolicy,
}

impl Default for DirectorSection {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_actuation_events: default_max_actuation_events(),
            clock_sync_error_bound_ns: 0,
            selection: SelectionPolicy::default(),
            missed_deadline: MissedDeadlinePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ActorEntry {
    name: String,
    #[serde(default)]
    depth: u32,
    /// Signed so that actors may declare a negative latency budget.
    #[serde(default)]
    offset_ns: i64,
    #[serde(default)]
    inputs: u16,
}

fn default_max_events() -> usize {
    120
}

fn default_max_actuation_events() -> usize {
    16
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_events must be in 1..={max}, got {got}")]
    InvalidMaxEvents { got: usize, max: usize },

    #[error("max_actuation_events must be at most {max}, got {got}")]
    InvalidMaxActuationEvents { got: usize, max: usize },

    #[error("at least one actor must be configured")]
    NoActors,

    #[error("too many actors: {0}")]
    TooManyActors(usize),

    #[error("duplicate actor name '{0}'")]
    DuplicateActor(String),

    #[error("duplicate actuator name '{0}'")]
    DuplicateActuator(String),

    #[error("total input port count {0} exceeds 65535")]
    TooManyPorts(usize),
}

// ── Public data structures ────────────────────────────────────────────────────

/// One configured actor instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorConfig {
    pub name: String,
    /// Position in the dependency graph; lower fires first on equal keys.
    pub depth: u32,
    /// Worst-case latency budget (`offsetTime`).
    pub offset: SignedTime,
    /// Number of input ports.
    pub inputs: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorConfig {
    /// Event arena and preemption stack capacity (`MAX_EVENTS`).
    pub max_events: usize,
    pub max_actuation_events: usize,
    /// Added to network delay bounds when checking late arrivals.
    pub clock_sync_error_bound: Time,
    pub selection: SelectionPolicy,
    pub missed_deadline: MissedDeadlinePolicy,
    pub actors: Vec<ActorConfig>,
    pub actuators: Vec<String>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_actuation_events: default_max_actuation_events(),
            clock_sync_error_bound: Time::ZERO,
            selection: SelectionPolicy::default(),
            missed_deadline: MissedDeadlinePolicy::default(),
            actors: Vec::new(),
            actuators: Vec::new(),
        }
    }
}

impl DirectorConfig {
    /// Parses and validates the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading director configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: DirectorConfigFile =
            serde_yaml::from_str(yaml).context("Failed to parse director YAML")?;

        let config = Self {
            max_events: file.director.max_events,
            max_actuation_events: file.director.max_actuation_events,
            clock_sync_error_bound: Time::from_nanos(file.director.clock_sync_error_bound_ns),
            selection: file.director.selection,
            missed_deadline: file.director.missed_deadline,
            actors: file
                .actors
                .into_iter()
                .map(|entry| ActorConfig {
                    name: entry.name,
                    depth: entry.depth,
                    offset: SignedTime::from_nanos(entry.offset_ns),
                    inputs: entry.inputs,
                })
                .collect(),
            actuators: file.actuators,
        };
        config.validate()?;

        for actor in &config.actors {
            debug!(
                "  Actor: {} | depth: {} | offset: {} | inputs: {}",
                actor.name, actor.depth, actor.offset, actor.inputs
            );
        }
        info!(
            "Loaded director configuration: {} actor(s), {} actuator(s), {} event slots, {:?}",
            config.actors.len(),
            config.actuators.len(),
            config.max_events,
            config.selection,
        );
        Ok(config)
    }

    /// Checks capacities and naming.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ARENA_CAPACITY).contains(&self.max_events) {
            return Err(ConfigError::InvalidMaxEvents {
                got: self.max_events,
                max: MAX_ARENA_CAPACITY,
            });
        }
        if self.max_actuation_events > usize::from(u16::MAX) {
            return Err(ConfigError::InvalidMaxActuationEvents {
                got: self.max_actuation_events,
                max: usize::from(u16::MAX),
            });
        }
        if self.actors.is_empty() {
            return Err(ConfigError::NoActors);
        }
        if self.actors.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TooManyActors(self.actors.len()));
        }

        let mut names = BTreeSet::new();
        for actor in &self.actors {
            if !names.insert(actor.name.as_str()) {
                return Err(ConfigError::DuplicateActor(actor.name.clone()));
            }
        }
        let mut actuators = BTreeSet::new();
        for name in &self.actuators {
            if !actuators.insert(name.as_str()) {
                return Err(ConfigError::DuplicateActuator(name.clone()));
            }
        }

        let ports: usize = self.actors.iter().map(|a| usize::from(a.inputs)).sum();
        if ports > usize::from(u16::MAX) {
            return Err(ConfigError::TooManyPorts(ports));
        }
        Ok(())
    }

    /// Total number of input ports across all actors.
    pub fn port_count(&self) -> usize {
        self.actors.iter().map(|a| usize::from(a.inputs)).sum()
    }

    // ── Builder helpers ───────────────────────────────────────────────────────

    pub fn with_actor(
        mut self,
        name: impl Into<String>,
        depth: u32,
        offset: SignedTime,
        inputs: u16,
    ) -> Self {
        self.actors.push(ActorConfig {
            name: name.into(),
            depth,
            offset,
            inputs,
        });
        self
    }

    pub fn with_actuator(mut self, name: impl Into<String>) -> Self {
        self.actuators.push(name.into());
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_max_actuation_events(mut self, max: usize) -> Self {
        self.max_actuation_events = max;
        self
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_missed_deadline(mut self, policy: MissedDeadlinePolicy) -> Self {
        self.missed_deadline = policy;
        self
    }

    pub fn with_clock_sync_error_bound(mut self, bound: Time) -> Self {
        self.clock_sync_error_bound = bound;
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
