// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Headless simulation command
//!
//! Loads the fleet configuration, runs the grid world for the configured
//! number of ticks and prints the shared target registry at the end.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use overwatch_core::domain::fleet_config::FleetConfigManifest;
use overwatch_core::infrastructure::{EventBus, EventBusError, EventReceiver};

use crate::simulation::{format_entry, ThreatCensus, TickSummary, World};

#[derive(Args, Debug, Clone, Default)]
pub struct SimulateArgs {
    /// Number of ticks to run (default: from configuration)
    #[arg(long)]
    pub ticks: Option<u64>,

    /// RNG seed for a reproducible run (default: from configuration, else random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stream every domain event to stdout as JSON lines
    #[arg(long)]
    pub json_events: bool,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

pub async fn handle_command(args: SimulateArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut manifest = FleetConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    apply_args(&mut manifest, &args);
    manifest
        .validate()
        .context("Configuration validation failed")?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    let seed = manifest.spec.simulation.seed.unwrap_or_else(rand::random);
    let event_bus = EventBus::with_default_capacity();
    let printer = args
        .json_events
        .then(|| spawn_event_printer(event_bus.subscribe()));

    let mut world = World::new(&manifest, event_bus, seed)?;
    let ticks = manifest.spec.simulation.ticks;
    let interval = manifest.spec.simulation.tick_interval_ms;

    if !args.json_events {
        println!(
            "{} {} ({} ticks, seed {}, zone {})",
            "Simulating".bold(),
            manifest.metadata.name,
            ticks,
            seed,
            world.zone()
        );
    }

    for _ in 0..ticks {
        let summary = world.step()?;
        if !args.json_events {
            print_tick(&summary);
        }
        if interval > 0 {
            tokio::time::sleep(Duration::from_millis(interval)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    if !args.json_events {
        print_report(&world);
    }

    // dropping the world closes the bus and ends the printer
    drop(world);
    if let Some(printer) = printer {
        printer.await.context("Event printer task failed")?;
    }

    Ok(())
}

fn apply_args(manifest: &mut FleetConfigManifest, args: &SimulateArgs) {
    if let Some(ticks) = args.ticks {
        manifest.spec.simulation.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        manifest.spec.simulation.seed = Some(seed);
    }
}

fn spawn_event_printer(mut receiver: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    })
}

fn print_tick(summary: &TickSummary) {
    let tick = summary.report.tick;
    for outcome in &summary.outcomes {
        if let Some(target) = &outcome.captured {
            println!(
                "  [{:>4}] {} {} {}",
                tick,
                outcome.agent_id,
                "captured".red().bold(),
                target
            );
        }
    }
    for target in &summary.report.expired {
        println!("  [{:>4}] {} {}", tick, "expired".dimmed(), target);
    }
}

fn print_report(world: &World) {
    let stats = world.stats();
    let census = ThreatCensus::of(world.persons());

    println!();
    println!("{}", "Summary:".bold());
    println!("  Ticks: {}", stats.ticks);
    println!(
        "  Decisions: {} lock, {} contended, {} warn",
        stats.locks, stats.contentions, stats.warnings
    );
    println!("  Captures: {}", stats.captures);
    println!("  Expired entries: {}", stats.expired);
    println!(
        "  Population: {} low, {} elevated, {} high, {} captured",
        census.low.to_string().green(),
        census.elevated.to_string().yellow(),
        census.high.to_string().red(),
        census.captured
    );
    println!();

    println!("{}", "Drones:".bold());
    for drone in world.drones() {
        let held = world
            .coordinator()
            .held_target(&drone.id)
            .map(|target| target.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {} pos={} target={}", drone.id, drone.position, held);
    }
    println!();

    let entries = world.coordinator().registry().snapshot();
    println!("{} ({})", "Shared Targets:".bold(), entries.len());
    if entries.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for entry in &entries {
        let line = format_entry(entry);
        if entry.holder().is_some() {
            println!("  {}", line.cyan());
        } else {
            println!("  {}", line);
        }
    }
}
