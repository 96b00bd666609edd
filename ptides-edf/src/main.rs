/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use ptides_edf::config::DirectorConfig;
use ptides_edf::demo::{self, DemoParams, DemoWiring, LoggingMotor};
use ptides_edf::director::{Director, DirectorStats};
use ptides_edf::event::PendingEvent;
use ptides_edf::platform::{HostPlatform, Platform, SimPlatform};
use ptides_edf::time::{Tag, Time};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Ptides preemptive-EDF director running a sample control loop.
///
/// Example:
///   ptides-edf --config director.yaml --until 2.5 --sensor-period-ms 5
#[derive(Debug, Parser)]
#[command(
    name = "ptides-edf",
    about = "Ptides preemptive-EDF director – sample control loop",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML director configuration (built-in pipeline if absent).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Platform time to run for, in seconds.
    #[arg(short = 'u', long = "until", default_value_t = 1.0)]
    until: f64,

    /// Sensor sampling period in milliseconds.
    #[arg(
        short = 'p',
        long = "sensor-period-ms",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sensor_period_ms: u64,

    /// Run against the wall clock instead of a simulated one.
    #[arg(short = 'r', long = "realtime", default_value_t = false)]
    realtime: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config           = ?cli.config,
        until            = cli.until,
        sensor_period_ms = cli.sensor_period_ms,
        realtime         = cli.realtime,
        "Configuration"
    );

    // ── Load director configuration ───────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => DirectorConfig::load_from_file(path),
        None => {
            warn!("No director configuration file provided, using the built-in pipeline");
            demo::default_config()
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load director configuration: {:#}", e);
            process::exit(1);
        }
    };

    let params = DemoParams {
        period: Time::from_millis(cli.sensor_period_ms),
        ..DemoParams::default()
    };
    let until = Time::from_nanos((cli.until.max(0.0) * 1e9) as u64);

    let result = if cli.realtime {
        run_on_host(&config, &params, until).await
    } else {
        run_on_sim(&config, &params, until)
    };

    match result {
        Ok(stats) => info!(
            fired = stats.fired,
            groups_merged = stats.groups_merged,
            timers_armed = stats.timers_armed,
            actuations = stats.actuations,
            "Run complete"
        ),
        Err(e) => {
            error!("Run failed: {:#}", e);
            process::exit(1);
        }
    }
}

fn run_on_sim(config: &DirectorConfig, params: &DemoParams, until: Time) -> Result<DirectorStats> {
    let mut director = Director::new(SimPlatform::new(), config)?;
    let wiring = demo::install(&mut director, params, Box::new(LoggingMotor::new("motor")))?;
    info!(until = %until, "Running on simulated clock");
    Ok(demo::run_simulated(&mut director, &wiring, params.period, until))
}

async fn run_on_host(
    config: &DirectorConfig,
    params: &DemoParams,
    until: Time,
) -> Result<DirectorStats> {
    let mut director = Director::new(HostPlatform::new(), config)?;
    let wiring = demo::install(&mut director, params, Box::new(LoggingMotor::new("motor")))?;
    info!(until = %until, "Running on wall clock");
    run_realtime(&mut director, &wiring, params.period, until).await;
    Ok(director.stats())
}

/// Same interrupt servicing order as the simulated loop, but sleeping on the
/// tokio timer until the next sensor sample or armed platform timer.
async fn run_realtime(
    director: &mut Director<HostPlatform>,
    wiring: &DemoWiring,
    period: Time,
    until: Time,
) {
    let start = director.platform().real_time();
    director.post(PendingEvent::pure(wiring.setpoint, Tag::new(start, 0)));
    let mut next_sample = start;

    loop {
        let next = director
            .platform()
            .next_wakeup()
            .map_or(next_sample, |wakeup| wakeup.min(next_sample));
        if next > until {
            break;
        }
        tokio::time::sleep(director.platform().duration_until(next)).await;

        if director.platform().real_time() >= next_sample {
            demo::sensor_interrupt(director, wiring);
            director.process_events();
            next_sample = next_sample.saturating_add(period);
        }
        if director.platform().take_expired_timer().is_some() {
            director.on_timer_interrupt();
        }
        if director.platform().actuation_due() {
            director.on_actuation_interrupt();
        }
    }
}
