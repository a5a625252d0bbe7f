// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::agent::AgentId;
use crate::domain::entity::{GridPosition, TargetId};

/// Lock-coordination events emitted by the swarm coordinator.
///
/// `tick` is the simulation time (registry time units); the `*_at` field is
/// wall-clock time for operators reading the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinationEvent {
    TargetLocked {
        target_id: TargetId,
        agent_id: AgentId,
        position: GridPosition,
        tick: u64,
        locked_at: DateTime<Utc>,
    },
    LockContended {
        target_id: TargetId,
        agent_id: AgentId,
        holder: AgentId,
        tick: u64,
        contended_at: DateTime<Utc>,
    },
    WarningRaised {
        target_id: TargetId,
        agent_id: AgentId,
        position: GridPosition,
        tick: u64,
        raised_at: DateTime<Utc>,
    },
    LockReleased {
        target_id: TargetId,
        agent_id: AgentId,
        tick: u64,
        released_at: DateTime<Utc>,
    },
    TargetCaptured {
        target_id: TargetId,
        agent_id: AgentId,
        was_locked: bool,
        tick: u64,
        captured_at: DateTime<Utc>,
    },
    EntryExpired {
        target_id: TargetId,
        age: u64,
        tick: u64,
        expired_at: DateTime<Utc>,
    },
    /// Registry entry removed because its entity was already marked captured.
    GhostPurged {
        target_id: TargetId,
        tick: u64,
        purged_at: DateTime<Utc>,
    },
}

impl CoordinationEvent {
    pub fn target_id(&self) -> &TargetId {
        match self {
            CoordinationEvent::TargetLocked { target_id, .. }
            | CoordinationEvent::LockContended { target_id, .. }
            | CoordinationEvent::WarningRaised { target_id, .. }
            | CoordinationEvent::LockReleased { target_id, .. }
            | CoordinationEvent::TargetCaptured { target_id, .. }
            | CoordinationEvent::EntryExpired { target_id, .. }
            | CoordinationEvent::GhostPurged { target_id, .. } => target_id,
        }
    }

    pub fn tick(&self) -> u64 {
        match self {
            CoordinationEvent::TargetLocked { tick, .. }
            | CoordinationEvent::LockContended { tick, .. }
            | CoordinationEvent::WarningRaised { tick, .. }
            | CoordinationEvent::LockReleased { tick, .. }
            | CoordinationEvent::TargetCaptured { tick, .. }
            | CoordinationEvent::EntryExpired { tick, .. }
            | CoordinationEvent::GhostPurged { tick, .. } => *tick,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TickEvent {
    TickCompleted {
        tick: u64,
        decisions: usize,
        registry_entries: usize,
        locked_entries: usize,
        completed_at: DateTime<Utc>,
    },
}
