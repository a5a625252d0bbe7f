// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Coordinator
//!
//! Drives the per-tick protocol for a fleet of decision engines sharing one
//! [`TargetRegistry`], and mirrors every registry transition onto the
//! [`EventBus`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Ghost purge, stable-order decide, capture/release hooks,
//!   staleness sweep and tick completion

use chrono::Utc;
use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::{GridPosition, ProtectedZone, TargetId, ThreatEntity};
use overwatch_core::domain::events::{CoordinationEvent, TickEvent};
use overwatch_core::domain::fleet_config::FleetConfigManifest;
use overwatch_core::infrastructure::EventBus;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::engine::{Action, Decision, DecisionEngine, EngineConfig};
use crate::domain::error::SwarmError;
use crate::domain::registry::TargetRegistry;

/// Summary of the end-of-tick bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub decisions: usize,
    pub expired: Vec<TargetId>,
    pub registry_entries: usize,
    pub locked_entries: usize,
}

pub struct SwarmCoordinator {
    registry: Arc<TargetRegistry>,
    engines: Vec<DecisionEngine>,
    config: EngineConfig,
    event_bus: EventBus,
}

impl SwarmCoordinator {
    pub fn new(config: EngineConfig, registry: Arc<TargetRegistry>, event_bus: EventBus) -> Self {
        Self {
            registry,
            engines: Vec::new(),
            config,
            event_bus,
        }
    }

    /// Build a coordinator with agents `D0..Dn` from a fleet manifest.
    pub fn from_manifest(manifest: &FleetConfigManifest, event_bus: EventBus) -> Result<Self, SwarmError> {
        let config = EngineConfig::try_from(&manifest.spec.engine)?;
        let registry = Arc::new(TargetRegistry::new(manifest.spec.registry.entry_ttl)?);
        let mut coordinator = Self::new(config, registry, event_bus);
        for index in 0..manifest.spec.simulation.drones {
            coordinator.register_agent(AgentId::indexed(index))?;
        }
        Ok(coordinator)
    }

    /// Add an agent at the end of the decide order.
    pub fn register_agent(&mut self, agent_id: AgentId) -> Result<(), SwarmError> {
        if self.engines.iter().any(|engine| engine.agent_id() == &agent_id) {
            return Err(SwarmError::DuplicateAgent(agent_id));
        }
        info!(agent = %agent_id, order = self.engines.len(), "Registered agent");
        self.engines.push(DecisionEngine::new(
            agent_id,
            self.config,
            Arc::clone(&self.registry),
        ));
        Ok(())
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Agents in decide order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentId> {
        self.engines.iter().map(|engine| engine.agent_id())
    }

    pub fn held_target(&self, agent_id: &AgentId) -> Option<&TargetId> {
        self.engines
            .iter()
            .find(|engine| engine.agent_id() == agent_id)
            .and_then(|engine| engine.held_target())
    }

    /// Delete registry entries whose entity is already marked captured.
    pub fn purge_captured(&mut self, entities: &[ThreatEntity], now: u64) -> Vec<TargetId> {
        let mut purged = Vec::new();
        for entity in entities.iter().filter(|entity| entity.is_captured()) {
            if self.registry.capture(&entity.id).is_some() {
                self.forget_everywhere(&entity.id);
                debug!(target = %entity.id, "Purged registry entry of captured entity");
                self.event_bus
                    .publish_coordination_event(CoordinationEvent::GhostPurged {
                        target_id: entity.id.clone(),
                        tick: now,
                        purged_at: Utc::now(),
                    });
                purged.push(entity.id.clone());
            }
        }
        purged
    }

    /// Run one agent's decide step and publish the resulting events.
    pub fn decide(
        &mut self,
        agent_id: &AgentId,
        position: GridPosition,
        entities: &[ThreatEntity],
        zone: &ProtectedZone,
        now: u64,
    ) -> Result<Decision, SwarmError> {
        let engine = self.engine_mut(agent_id)?;
        let decision = engine.decide_detailed(position, entities, zone, now);
        self.publish_decision(&decision, now);
        Ok(decision)
    }

    /// Decide for every agent in registration order.
    ///
    /// Every registered agent must have an entry in `positions`.
    pub fn decide_all(
        &mut self,
        positions: &HashMap<AgentId, GridPosition>,
        entities: &[ThreatEntity],
        zone: &ProtectedZone,
        now: u64,
    ) -> Result<Vec<Decision>, SwarmError> {
        let order: Vec<AgentId> = self.agents().cloned().collect();
        let mut decisions = Vec::with_capacity(order.len());
        for agent_id in order {
            let position = *positions
                .get(&agent_id)
                .ok_or_else(|| SwarmError::MissingPosition(agent_id.clone()))?;
            decisions.push(self.decide(&agent_id, position, entities, zone, now)?);
        }
        Ok(decisions)
    }

    /// Capture hook: delete the registry entry and mark the entity captured in
    /// the same call.
    ///
    /// Returns `false` when `target` is not in `entities`; the registry entry
    /// is deleted either way. Nothing is published when neither the registry
    /// nor `entities` knew the target.
    pub fn report_capture(
        &mut self,
        agent_id: &AgentId,
        target: &TargetId,
        entities: &mut [ThreatEntity],
        now: u64,
    ) -> Result<bool, SwarmError> {
        let removed = self.engine_mut(agent_id)?.capture(target);
        self.forget_everywhere(target);
        let found = match entities.iter_mut().find(|entity| &entity.id == target) {
            Some(entity) => {
                entity.mark_captured();
                true
            }
            None => false,
        };

        if removed.is_none() && !found {
            debug!(agent = %agent_id, target = %target, "Capture reported for unknown target");
            return Ok(false);
        }

        let was_locked = removed.as_ref().is_some_and(|entry| entry.holder().is_some());
        info!(agent = %agent_id, target = %target, was_locked, "Target captured");
        self.event_bus
            .publish_coordination_event(CoordinationEvent::TargetCaptured {
                target_id: target.clone(),
                agent_id: agent_id.clone(),
                was_locked,
                tick: now,
                captured_at: Utc::now(),
            });
        Ok(found)
    }

    /// Release hook for an agent abandoning its target.
    pub fn release(&mut self, agent_id: &AgentId, target: &TargetId, now: u64) -> Result<bool, SwarmError> {
        let released = self.engine_mut(agent_id)?.release(target, now);
        if released {
            self.publish_released(target, agent_id, now);
        }
        Ok(released)
    }

    /// Staleness sweep followed by tick completion.
    pub fn end_tick(&self, now: u64, decisions: usize) -> TickReport {
        let expired = self.registry.sweep(now);
        for entry in &expired {
            debug!(target = %entry.target_id(), age = entry.age(now), "Registry entry expired");
            self.event_bus
                .publish_coordination_event(CoordinationEvent::EntryExpired {
                    target_id: entry.target_id().clone(),
                    age: entry.age(now),
                    tick: now,
                    expired_at: Utc::now(),
                });
        }

        let report = TickReport {
            tick: now,
            decisions,
            expired: expired.iter().map(|entry| entry.target_id().clone()).collect(),
            registry_entries: self.registry.len(),
            locked_entries: self.registry.locked_count(),
        };
        self.event_bus.publish_tick_event(TickEvent::TickCompleted {
            tick: now,
            decisions,
            registry_entries: report.registry_entries,
            locked_entries: report.locked_entries,
            completed_at: Utc::now(),
        });
        report
    }

    fn forget_everywhere(&mut self, target: &TargetId) {
        for engine in self.engines.iter_mut() {
            if engine.forget(target) {
                debug!(agent = %engine.agent_id(), target = %target, "Cleared held target after capture");
            }
        }
    }

    fn engine_mut(&mut self, agent_id: &AgentId) -> Result<&mut DecisionEngine, SwarmError> {
        self.engines
            .iter_mut()
            .find(|engine| engine.agent_id() == agent_id)
            .ok_or_else(|| SwarmError::UnknownAgent(agent_id.clone()))
    }

    fn publish_decision(&self, decision: &Decision, now: u64) {
        if let Some(previous) = &decision.replaced {
            self.publish_released(previous, &decision.agent_id, now);
        }

        let position = decision.target_position.unwrap_or_default();
        let event = match &decision.action {
            Action::NoAction => return,
            Action::LockAndPursue { target } => {
                if !decision.newly_locked {
                    return;
                }
                CoordinationEvent::TargetLocked {
                    target_id: target.clone(),
                    agent_id: decision.agent_id.clone(),
                    position,
                    tick: now,
                    locked_at: Utc::now(),
                }
            }
            Action::AlreadyLocked { holder, .. } if holder == &decision.agent_id => return,
            Action::AlreadyLocked { target, holder } => CoordinationEvent::LockContended {
                target_id: target.clone(),
                agent_id: decision.agent_id.clone(),
                holder: holder.clone(),
                tick: now,
                contended_at: Utc::now(),
            },
            Action::Warn { target } => CoordinationEvent::WarningRaised {
                target_id: target.clone(),
                agent_id: decision.agent_id.clone(),
                position,
                tick: now,
                raised_at: Utc::now(),
            },
        };
        self.event_bus.publish_coordination_event(event);
    }

    fn publish_released(&self, target: &TargetId, agent_id: &AgentId, now: u64) {
        self.event_bus
            .publish_coordination_event(CoordinationEvent::LockReleased {
                target_id: target.clone(),
                agent_id: agent_id.clone(),
                tick: now,
                released_at: Utc::now(),
            });
    }
}
