// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Headless grid world
//!
//! Persons wander one cell at a time; drones patrol until the coordinator
//! grants them a lock, then close in one Chebyshev step per tick and capture
//! on contact. Operator scenario commands stand in for interactive input.

use anyhow::{Context, Result};
use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::{GridPosition, ProtectedZone, TargetId, ThreatEntity};
use overwatch_core::domain::fleet_config::{FleetConfigManifest, OperatorCommand, ScenarioStep};
use overwatch_core::infrastructure::EventBus;
use overwatch_swarm::application::{SwarmCoordinator, TickReport};
use overwatch_swarm::domain::Action;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Probability that an idle drone takes a patrol step in a given tick.
const PATROL_PROBABILITY: f64 = 0.3;

/// Stay, north, south, east, west.
const WALK_STEPS: [(i32, i32); 5] = [(0, 0), (0, -1), (0, 1), (1, 0), (-1, 0)];

#[derive(Debug, Clone, Serialize)]
pub struct Drone {
    pub id: AgentId,
    pub position: GridPosition,
}

/// What happened to one drone during a tick.
#[derive(Debug, Clone, Serialize)]
pub struct DroneOutcome {
    pub agent_id: AgentId,
    pub action: Action,
    pub position: GridPosition,
    pub captured: Option<TargetId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    pub report: TickReport,
    pub outcomes: Vec<DroneOutcome>,
    pub purged: Vec<TargetId>,
}

/// Running totals across a simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationStats {
    pub ticks: u64,
    pub locks: usize,
    pub contentions: usize,
    pub warnings: usize,
    pub captures: usize,
    pub expired: usize,
}

impl SimulationStats {
    fn record(&mut self, summary: &TickSummary) {
        self.ticks += 1;
        for outcome in &summary.outcomes {
            match &outcome.action {
                Action::LockAndPursue { .. } => self.locks += 1,
                Action::AlreadyLocked { holder, .. } if holder == &outcome.agent_id => {}
                Action::AlreadyLocked { .. } => self.contentions += 1,
                Action::Warn { .. } => self.warnings += 1,
                Action::NoAction => {}
            }
            if outcome.captured.is_some() {
                self.captures += 1;
            }
        }
        self.expired += summary.report.expired.len();
    }
}

pub struct World {
    width: u32,
    height: u32,
    zone: ProtectedZone,
    persons: Vec<ThreatEntity>,
    drones: Vec<Drone>,
    coordinator: SwarmCoordinator,
    scenario: Vec<ScenarioStep>,
    rng: StdRng,
    tick: u64,
    stats: SimulationStats,
}

impl World {
    /// Build a world from a manifest. The manifest is validated first.
    pub fn new(manifest: &FleetConfigManifest, event_bus: EventBus, seed: u64) -> Result<Self> {
        manifest.validate().context("Invalid fleet configuration")?;
        let spec = &manifest.spec;
        let zone_settings = &spec.protected_zone;
        let zone = ProtectedZone::new(
            zone_settings.x1,
            zone_settings.y1,
            zone_settings.x2,
            zone_settings.y2,
        )?;
        let coordinator = SwarmCoordinator::from_manifest(manifest, event_bus)
            .context("Failed to build swarm coordinator")?;

        let mut rng = StdRng::seed_from_u64(seed);
        let (width, height) = (spec.grid.width, spec.grid.height);

        let mut persons = Vec::with_capacity(spec.simulation.persons);
        for index in 0..spec.simulation.persons {
            let position = random_cell(&mut rng, width, height);
            let threat: f64 = rng.random();
            persons.push(ThreatEntity::new(TargetId::indexed(index), position, threat)?);
        }

        // spread along the top, like a launch line
        let count = coordinator.agents().count();
        let launch_row = 3i32.min(axis_len(height) - 1);
        let drones: Vec<Drone> = coordinator
            .agents()
            .enumerate()
            .map(|(index, id)| {
                let x = ((index + 1) as u64 * width as u64 / (count + 1) as u64) as i32;
                Drone {
                    id: id.clone(),
                    position: GridPosition::new(x, launch_row).clamped(width, height),
                }
            })
            .collect();

        info!(
            seed,
            drones = count,
            persons = persons.len(),
            zone = %zone,
            "Simulation world created"
        );

        Ok(Self {
            width,
            height,
            zone,
            persons,
            drones,
            coordinator,
            scenario: spec.scenario.clone(),
            rng,
            tick: 0,
            stats: SimulationStats::default(),
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn persons(&self) -> &[ThreatEntity] {
        &self.persons
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn zone(&self) -> &ProtectedZone {
        &self.zone
    }

    pub fn coordinator(&self) -> &SwarmCoordinator {
        &self.coordinator
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Advance the world by one tick.
    pub fn step(&mut self) -> Result<TickSummary> {
        self.tick += 1;
        let now = self.tick;

        self.apply_scenario(now);
        self.move_persons();
        let purged = self.coordinator.purge_captured(&self.persons, now);

        let mut outcomes = Vec::with_capacity(self.drones.len());
        for index in 0..self.drones.len() {
            outcomes.push(self.step_drone(index, now)?);
        }

        let report = self.coordinator.end_tick(now, outcomes.len());
        let summary = TickSummary {
            report,
            outcomes,
            purged,
        };
        self.stats.record(&summary);
        Ok(summary)
    }

    fn step_drone(&mut self, index: usize, now: u64) -> Result<DroneOutcome> {
        let agent_id = self.drones[index].id.clone();
        let position = self.drones[index].position;

        let decision = self
            .coordinator
            .decide(&agent_id, position, &self.persons, &self.zone, now)?;
        debug!(agent = %agent_id, action = %decision.action, "Drone decided");

        let mut captured = None;
        match self.coordinator.held_target(&agent_id).cloned() {
            Some(target) => {
                let target_position = self
                    .persons
                    .iter()
                    .find(|person| person.id == target && !person.is_captured())
                    .map(|person| person.position);

                match target_position {
                    None => {
                        warn!(agent = %agent_id, target = %target, "Held target vanished; releasing lock");
                        self.coordinator.release(&agent_id, &target, now)?;
                    }
                    Some(target_position) => {
                        let next = position.step_toward(&target_position);
                        self.drones[index].position = next;
                        if next == target_position {
                            self.coordinator
                                .report_capture(&agent_id, &target, &mut self.persons, now)?;
                            captured = Some(target);
                        }
                    }
                }
            }
            None => {
                if self.rng.random_bool(PATROL_PROBABILITY) {
                    let next = self.random_walk(position);
                    self.drones[index].position = next;
                }
            }
        }

        Ok(DroneOutcome {
            agent_id,
            action: decision.action,
            position: self.drones[index].position,
            captured,
        })
    }

    fn move_persons(&mut self) {
        for index in 0..self.persons.len() {
            if self.persons[index].is_captured() {
                continue;
            }
            let next = self.random_walk(self.persons[index].position);
            self.persons[index].position = next;
        }
    }

    fn random_walk(&mut self, from: GridPosition) -> GridPosition {
        let (dx, dy) = WALK_STEPS[self.rng.random_range(0..WALK_STEPS.len())];
        GridPosition::new(from.x + dx, from.y + dy).clamped(self.width, self.height)
    }

    fn apply_scenario(&mut self, now: u64) {
        let due: Vec<OperatorCommand> = self
            .scenario
            .iter()
            .filter(|step| step.at_tick == now)
            .map(|step| step.command.clone())
            .collect();

        for command in due {
            if let Err(e) = self.apply_command(&command) {
                warn!(tick = now, error = %e, "Operator command rejected");
            }
        }
    }

    /// Apply an operator command immediately.
    pub fn apply_command(&mut self, command: &OperatorCommand) -> Result<()> {
        match command {
            OperatorCommand::RaiseThreat { target, amount } => {
                let person = self
                    .persons
                    .iter_mut()
                    .find(|person| &person.id == target)
                    .with_context(|| format!("Unknown person: {}", target))?;
                let threat = person.raise_threat(*amount)?;
                info!(target = %target, threat, "Operator raised threat");
            }
            OperatorCommand::Spawn { id, x, y, threat } => {
                if self.persons.iter().any(|person| &person.id == id) {
                    anyhow::bail!("Person {} already exists", id);
                }
                let position = GridPosition::new(*x, *y).clamped(self.width, self.height);
                self.persons
                    .push(ThreatEntity::new(id.clone(), position, *threat)?);
                info!(target = %id, position = %position, threat, "Operator spawned person");
            }
        }
        Ok(())
    }
}

fn random_cell(rng: &mut StdRng, width: u32, height: u32) -> GridPosition {
    GridPosition::new(
        rng.random_range(0..axis_len(width)),
        rng.random_range(0..axis_len(height)),
    )
}

/// Grid dimension as a cell-coordinate bound, saturating at `i32::MAX`.
fn axis_len(dimension: u32) -> i32 {
    i32::try_from(dimension).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> FleetConfigManifest {
        let mut manifest = FleetConfigManifest::default();
        manifest.spec.simulation.persons = 6;
        manifest
    }

    #[test]
    fn test_world_setup() {
        let world = World::new(&manifest(), EventBus::new(16), 1).unwrap();
        assert_eq!(world.persons().len(), 6);
        assert_eq!(world.drones().len(), 3);
        let xs: Vec<i32> = world.drones().iter().map(|d| d.position.x).collect();
        assert_eq!(xs, vec![7, 14, 21]);
        assert!(world.drones().iter().all(|d| d.position.y == 3));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let mut manifest = manifest();
        manifest.spec.grid.height = u32::MAX;
        assert!(World::new(&manifest, EventBus::new(16), 1).is_err());
        assert_eq!(axis_len(u32::MAX), i32::MAX);
        assert_eq!(axis_len(20), 20);
    }

    #[test]
    fn test_own_lock_is_not_a_contention() {
        let outcome = |agent: &str, holder: &str| DroneOutcome {
            agent_id: AgentId::new(agent),
            action: Action::AlreadyLocked {
                target: TargetId::new("X"),
                holder: AgentId::new(holder),
            },
            position: GridPosition::new(12, 10),
            captured: None,
        };
        let summary = TickSummary {
            report: TickReport {
                tick: 1,
                decisions: 2,
                expired: Vec::new(),
                registry_entries: 1,
                locked_entries: 1,
            },
            outcomes: vec![outcome("D0", "D0"), outcome("D1", "D0")],
            purged: Vec::new(),
        };

        let mut stats = SimulationStats::default();
        stats.record(&summary);
        assert_eq!(stats.contentions, 1);
        assert_eq!(stats.locks, 0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut world = World::new(&manifest(), EventBus::new(16), seed).unwrap();
            for _ in 0..50 {
                world.step().unwrap();
            }
            (world.stats().clone(), world.coordinator().registry().snapshot())
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_entities_stay_on_grid() {
        let mut world = World::new(&manifest(), EventBus::new(16), 3).unwrap();
        for _ in 0..100 {
            world.step().unwrap();
        }
        let on_grid = |p: &GridPosition| (0..28).contains(&p.x) && (0..20).contains(&p.y);
        assert!(world.persons().iter().all(|p| on_grid(&p.position)));
        assert!(world.drones().iter().all(|d| on_grid(&d.position)));
    }

    #[test]
    fn test_operator_commands() {
        let mut world = World::new(&manifest(), EventBus::new(16), 5).unwrap();
        world
            .apply_command(&OperatorCommand::Spawn {
                id: TargetId::new("P99"),
                x: 12,
                y: 9,
                threat: 0.5,
            })
            .unwrap();
        world
            .apply_command(&OperatorCommand::RaiseThreat {
                target: TargetId::new("P99"),
                amount: 0.75,
            })
            .unwrap();

        let spawned = world.persons().iter().find(|p| p.id.as_str() == "P99").unwrap();
        assert_eq!(spawned.threat(), 1.0);
        assert!(world
            .apply_command(&OperatorCommand::RaiseThreat {
                target: TargetId::new("nobody"),
                amount: 0.25,
            })
            .is_err());
    }

    #[test]
    fn test_drone_captures_adjacent_threat() {
        let mut manifest = manifest();
        manifest.spec.simulation.persons = 0;
        manifest.spec.simulation.drones = 1;
        let mut world = World::new(&manifest, EventBus::new(16), 9).unwrap();
        world.drones[0].position = GridPosition::new(12, 10);
        world
            .apply_command(&OperatorCommand::Spawn {
                id: TargetId::new("X"),
                x: 12,
                y: 10,
                threat: 1.0,
            })
            .unwrap();

        // the person walks at most one cell, the drone closes one cell
        let summary = world.step().unwrap();
        assert_eq!(summary.outcomes[0].captured, Some(TargetId::new("X")));
        assert!(world.persons()[0].is_captured());
        assert!(world.coordinator().registry().is_empty());
    }
}
