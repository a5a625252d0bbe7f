// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decision Engine
//!
//! One engine per drone. Each tick the coordinator calls [`DecisionEngine::decide`]
//! with the drone's position and the current entity snapshot; the engine picks
//! the single best candidate in sensor range and translates it into a registry
//! mutation plus an [`Action`].
//!
//! ## Decide Steps
//!
//! 1. Drop the held target if the registry no longer names this agent its holder.
//! 2. Scan and score candidates ([`ScoringPolicy::select_best`]).
//! 3. Pursuit candidate: acquire the lock, or report it as already locked
//!    (by another agent, or by this one on a re-sighting).
//! 4. Warning candidate: upsert a warning entry; the holder is never touched.
//!
//! A drone switching targets acquires the new one and releases the old one in
//! a single registry call, so it never holds two identities.

use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::{GridPosition, ProtectedZone, TargetId, ThreatEntity};
use overwatch_core::domain::fleet_config::EngineSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::error::SwarmError;
use crate::domain::registry::{AcquireOutcome, RegistryEntry, TargetRegistry};
use crate::domain::scoring::{CandidateClass, ScoringPolicy};

/// Engine tuning, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Chebyshev sensor radius in grid cells.
    pub sensor_radius: u32,
    pub threat_threshold: f64,
    pub warn_discount: f64,
}

impl EngineConfig {
    pub fn new(sensor_radius: i32, threat_threshold: f64, warn_discount: f64) -> Result<Self, SwarmError> {
        let sensor_radius = u32::try_from(sensor_radius).map_err(|_| {
            SwarmError::InvalidConfig(format!("sensor radius cannot be negative: {}", sensor_radius))
        })?;
        if !threat_threshold.is_finite() || !(0.0..=1.0).contains(&threat_threshold) {
            return Err(SwarmError::InvalidConfig(format!(
                "threat threshold must be within [0, 1]: {}",
                threat_threshold
            )));
        }
        if !(warn_discount > 0.0 && warn_discount <= 1.0) {
            return Err(SwarmError::InvalidConfig(format!(
                "warn discount must be within (0, 1]: {}",
                warn_discount
            )));
        }
        Ok(Self {
            sensor_radius,
            threat_threshold,
            warn_discount,
        })
    }

    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy::new(self.threat_threshold, self.warn_discount)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sensor_radius: 4,
            threat_threshold: 0.66,
            warn_discount: 0.8,
        }
    }
}

impl TryFrom<&EngineSettings> for EngineConfig {
    type Error = SwarmError;

    fn try_from(settings: &EngineSettings) -> Result<Self, Self::Error> {
        Self::new(
            settings.sensor_radius,
            settings.threat_threshold,
            settings.warn_discount,
        )
    }
}

/// Outcome of one decide step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    NoAction,
    LockAndPursue { target: TargetId },
    AlreadyLocked { target: TargetId, holder: AgentId },
    Warn { target: TargetId },
}

impl Action {
    pub fn target(&self) -> Option<&TargetId> {
        match self {
            Action::NoAction => None,
            Action::LockAndPursue { target }
            | Action::AlreadyLocked { target, .. }
            | Action::Warn { target } => Some(target),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NoAction => write!(f, "NO_ACTION"),
            Action::LockAndPursue { target } => write!(f, "LOCK+PURSUE {}", target),
            Action::AlreadyLocked { target, holder } => {
                write!(f, "ALREADY_LOCKED {} by {}", target, holder)
            }
            Action::Warn { target } => write!(f, "WARN {}", target),
        }
    }
}

/// An [`Action`] together with the registry transitions it caused.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub agent_id: AgentId,
    pub action: Action,
    /// Position recorded in the registry for the chosen target.
    pub target_position: Option<GridPosition>,
    /// A new lock was granted.
    pub newly_locked: bool,
    /// Lock dropped because the agent switched targets.
    pub replaced: Option<TargetId>,
}

impl Decision {
    fn idle(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            action: Action::NoAction,
            target_position: None,
            newly_locked: false,
            replaced: None,
        }
    }
}

/// Per-drone decision maker sharing the fleet's [`TargetRegistry`].
pub struct DecisionEngine {
    agent_id: AgentId,
    config: EngineConfig,
    policy: ScoringPolicy,
    registry: Arc<TargetRegistry>,
    held_target: Option<TargetId>,
}

impl DecisionEngine {
    pub fn new(agent_id: AgentId, config: EngineConfig, registry: Arc<TargetRegistry>) -> Self {
        Self {
            agent_id,
            policy: config.policy(),
            config,
            registry,
            held_target: None,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn held_target(&self) -> Option<&TargetId> {
        self.held_target.as_ref()
    }

    /// Run one decide step and return the resulting action.
    pub fn decide(
        &mut self,
        position: GridPosition,
        entities: &[ThreatEntity],
        zone: &ProtectedZone,
        now: u64,
    ) -> Action {
        self.decide_detailed(position, entities, zone, now).action
    }

    /// Like [`decide`](Self::decide) but also reports the lock transitions.
    pub fn decide_detailed(
        &mut self,
        position: GridPosition,
        entities: &[ThreatEntity],
        zone: &ProtectedZone,
        now: u64,
    ) -> Decision {
        self.reconcile_held_target();

        let Some(best) = self
            .policy
            .select_best(&position, self.config.sensor_radius, entities, zone)
        else {
            return Decision::idle(self.agent_id.clone());
        };

        let target = best.entity.id.clone();
        let target_position = best.entity.position;
        debug!(
            agent = %self.agent_id,
            target = %target,
            class = ?best.class,
            priority = best.priority.value,
            distance = best.priority.distance,
            "Selected candidate"
        );

        match best.class {
            CandidateClass::Pursue => self.pursue(target, target_position, now),
            CandidateClass::Warn => {
                self.registry
                    .observe_warning(&target, &self.agent_id, target_position, now);
                Decision {
                    agent_id: self.agent_id.clone(),
                    action: Action::Warn { target },
                    target_position: Some(target_position),
                    newly_locked: false,
                    replaced: None,
                }
            }
        }
    }

    fn pursue(&mut self, target: TargetId, target_position: GridPosition, now: u64) -> Decision {
        let previous = self.held_target.clone().filter(|held| held != &target);

        let outcome = match &previous {
            Some(previous) => self.registry.try_acquire_replacing(
                &target,
                previous,
                &self.agent_id,
                target_position,
                now,
            ),
            None => self
                .registry
                .try_acquire(&target, &self.agent_id, target_position, now),
        };

        match outcome {
            AcquireOutcome::Acquired => {
                debug_assert!(
                    previous
                        .as_ref()
                        .is_none_or(|old| !self.registry.is_held_by(old, &self.agent_id)),
                    "agent holds two targets"
                );
                self.held_target = Some(target.clone());
                Decision {
                    agent_id: self.agent_id.clone(),
                    action: Action::LockAndPursue { target },
                    target_position: Some(target_position),
                    newly_locked: true,
                    replaced: previous,
                }
            }
            // already ours: keep pursuing, report the lock as it stands
            AcquireOutcome::Reaffirmed => {
                self.held_target = Some(target.clone());
                Decision {
                    agent_id: self.agent_id.clone(),
                    action: Action::AlreadyLocked {
                        target,
                        holder: self.agent_id.clone(),
                    },
                    target_position: Some(target_position),
                    newly_locked: false,
                    replaced: None,
                }
            }
            AcquireOutcome::Contended { holder } => Decision {
                agent_id: self.agent_id.clone(),
                action: Action::AlreadyLocked { target, holder },
                target_position: Some(target_position),
                newly_locked: false,
                replaced: None,
            },
        }
    }

    fn reconcile_held_target(&mut self) {
        if let Some(held) = &self.held_target {
            if !self.registry.is_held_by(held, &self.agent_id) {
                warn!(agent = %self.agent_id, target = %held, "Held target no longer locked by this agent; clearing");
                self.held_target = None;
            }
        }
    }

    /// Release this agent's lock on `target`. Returns whether a lock was released.
    pub fn release(&mut self, target: &TargetId, now: u64) -> bool {
        let released = self.registry.release(target, &self.agent_id, now);
        if self.held_target.as_ref() == Some(target) {
            self.held_target = None;
        }
        released
    }

    /// Drop the local held target if it is `target`, without touching the
    /// registry. Used when another path already deleted the entry.
    pub fn forget(&mut self, target: &TargetId) -> bool {
        if self.held_target.as_ref() == Some(target) {
            self.held_target = None;
            true
        } else {
            false
        }
    }

    /// Delete the registry entry for `target` regardless of holder.
    pub fn capture(&mut self, target: &TargetId) -> Option<RegistryEntry> {
        let removed = self.registry.capture(target);
        self.forget(target);
        removed
    }
}
