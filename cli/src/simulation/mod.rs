// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Simulation harness
//!
//! Grid world that exercises the lock-coordination protocol end to end.
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Drives `SwarmCoordinator` from seeded random movement and
//!   operator scenario commands, and renders the results as text

pub mod report;
pub mod world;

pub use report::{format_entry, ThreatCensus};
pub use world::{Drone, DroneOutcome, SimulationStats, TickSummary, World};
