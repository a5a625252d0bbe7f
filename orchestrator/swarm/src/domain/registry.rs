// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Target Registry
//!
//! The one piece of shared mutable state in the fleet: a map from person to
//! coordination state, shared by every [`DecisionEngine`] through an `Arc`.
//!
//! ## Invariants
//!
//! - At most one agent occupies `holder` for an entry.
//! - WARN → LOCKED only through [`TargetRegistry::try_acquire`].
//! - LOCKED → WARN only through [`TargetRegistry::release`] by the holder.
//! - Locked entries leave the registry only through [`TargetRegistry::capture`];
//!   [`TargetRegistry::sweep`] never touches them.
//! - `contributors` is append-only.
//!
//! Every operation takes the registry mutex once, so each read-modify-write
//! on an entry is atomic with respect to every other agent.
//!
//! [`DecisionEngine`]: crate::domain::engine::DecisionEngine

use overwatch_core::domain::agent::AgentId;
use overwatch_core::domain::entity::{GridPosition, TargetId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::error::SwarmError;

/// Default staleness window, in time units.
pub const DEFAULT_ENTRY_TTL: u64 = 20;

/// Coordination state derived from the entry's holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Warn,
    Locked,
}

/// Read-only snapshot of a registry entry.
///
/// Fields are private to this module; the registry hands out clones so no
/// caller can mutate shared state behind the mutex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    target_id: TargetId,
    position: GridPosition,
    holder: Option<AgentId>,
    contributors: Vec<AgentId>,
    updated_at: u64,
    warning_only: bool,
}

impl RegistryEntry {
    fn new(
        target_id: TargetId,
        position: GridPosition,
        holder: Option<AgentId>,
        contributor: AgentId,
        now: u64,
    ) -> Self {
        let warning_only = holder.is_none();
        Self {
            target_id,
            position,
            holder,
            contributors: vec![contributor],
            updated_at: now,
            warning_only,
        }
    }

    fn touch(&mut self, agent_id: &AgentId, position: GridPosition, now: u64) {
        self.position = position;
        self.contributors.push(agent_id.clone());
        self.updated_at = now;
    }

    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn holder(&self) -> Option<&AgentId> {
        self.holder.as_ref()
    }

    pub fn contributors(&self) -> &[AgentId] {
        &self.contributors
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub fn warning_only(&self) -> bool {
        self.warning_only
    }

    pub fn state(&self) -> EntryState {
        if self.holder.is_some() {
            EntryState::Locked
        } else {
            EntryState::Warn
        }
    }

    /// Time since the last update; zero if `now` precedes it.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.updated_at)
    }
}

/// Result of a pursuit lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The entry was absent or unlocked; the caller now holds it.
    Acquired,
    /// The caller already held the entry; position and timestamp were
    /// refreshed and `warning_only` left as it was.
    Reaffirmed,
    /// Another agent holds the entry. Position and timestamp were still
    /// refreshed and the caller recorded as a contributor.
    Contended { holder: AgentId },
}

impl AcquireOutcome {
    pub fn is_held(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired | AcquireOutcome::Reaffirmed)
    }
}

/// Shared, mutex-guarded map from target identity to coordination state.
pub struct TargetRegistry {
    entries: Mutex<HashMap<TargetId, RegistryEntry>>,
    ttl: u64,
}

impl TargetRegistry {
    /// Create an empty registry. A zero TTL is rejected.
    pub fn new(ttl: u64) -> Result<Self, SwarmError> {
        if ttl == 0 {
            return Err(SwarmError::InvalidConfig(
                "entry TTL must be positive".to_string(),
            ));
        }
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        })
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Attempt to take the pursuit lock on `target_id`.
    ///
    /// Creates the entry when absent (including when another path deleted it
    /// since the caller last looked).
    pub fn try_acquire(
        &self,
        target_id: &TargetId,
        agent_id: &AgentId,
        position: GridPosition,
        now: u64,
    ) -> AcquireOutcome {
        let mut entries = self.entries.lock();
        acquire_locked(&mut entries, target_id, agent_id, position, now)
    }

    /// Attempt to lock `target_id`; on success, release `previous` if the
    /// agent still holds it. Both happen in one critical section so the agent
    /// is never observed holding two targets.
    pub fn try_acquire_replacing(
        &self,
        target_id: &TargetId,
        previous: &TargetId,
        agent_id: &AgentId,
        position: GridPosition,
        now: u64,
    ) -> AcquireOutcome {
        let mut entries = self.entries.lock();
        let outcome = acquire_locked(&mut entries, target_id, agent_id, position, now);
        if outcome == AcquireOutcome::Acquired && previous != target_id {
            release_locked(&mut entries, previous, agent_id, now);
        }
        outcome
    }

    /// Record a warning-class sighting. Never touches `holder`.
    ///
    /// Returns `true` when a new entry was created.
    pub fn observe_warning(
        &self,
        target_id: &TargetId,
        agent_id: &AgentId,
        position: GridPosition,
        now: u64,
    ) -> bool {
        let mut entries = self.entries.lock();
        metrics::counter!("overwatch_warnings_total").increment(1);

        match entries.get_mut(target_id) {
            Some(entry) => {
                entry.touch(agent_id, position, now);
                entry.warning_only = true;
                debug!(target = %target_id, agent = %agent_id, holder = ?entry.holder, "Warning refreshed");
                false
            }
            None => {
                entries.insert(
                    target_id.clone(),
                    RegistryEntry::new(target_id.clone(), position, None, agent_id.clone(), now),
                );
                debug!(target = %target_id, agent = %agent_id, "Warning entry created");
                true
            }
        }
    }

    /// Release the pursuit lock. A no-op unless `agent_id` is the holder.
    pub fn release(&self, target_id: &TargetId, agent_id: &AgentId, now: u64) -> bool {
        let mut entries = self.entries.lock();
        release_locked(&mut entries, target_id, agent_id, now)
    }

    /// Remove the entry unconditionally, whoever holds it.
    pub fn capture(&self, target_id: &TargetId) -> Option<RegistryEntry> {
        let removed = self.entries.lock().remove(target_id);
        if let Some(entry) = &removed {
            metrics::counter!("overwatch_captures_total").increment(1);
            info!(target = %target_id, holder = ?entry.holder, "Registry entry removed on capture");
        }
        removed
    }

    /// Delete unlocked entries idle for longer than the TTL.
    ///
    /// Returns the removed entries ordered by target id.
    pub fn sweep(&self, now: u64) -> Vec<RegistryEntry> {
        let mut entries = self.entries.lock();
        let ttl = self.ttl;

        let mut stale: Vec<TargetId> = entries
            .values()
            .filter(|entry| entry.holder.is_none() && entry.age(now) > ttl)
            .map(|entry| entry.target_id.clone())
            .collect();
        stale.sort();

        let expired: Vec<RegistryEntry> = stale
            .iter()
            .filter_map(|target_id| entries.remove(target_id))
            .collect();

        if !expired.is_empty() {
            metrics::counter!("overwatch_entries_expired_total").increment(expired.len() as u64);
            debug!(count = expired.len(), "Swept stale registry entries");
        }
        expired
    }

    pub fn entry(&self, target_id: &TargetId) -> Option<RegistryEntry> {
        self.entries.lock().get(target_id).cloned()
    }

    /// Current holder, if the entry exists and is locked.
    pub fn holder_of(&self, target_id: &TargetId) -> Option<AgentId> {
        self.entries
            .lock()
            .get(target_id)
            .and_then(|entry| entry.holder.clone())
    }

    pub fn is_held_by(&self, target_id: &TargetId, agent_id: &AgentId) -> bool {
        self.entries
            .lock()
            .get(target_id)
            .is_some_and(|entry| entry.holder.as_ref() == Some(agent_id))
    }

    /// All entries ordered by target id, for telemetry and display.
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self.entries.lock().values().cloned().collect();
        entries.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn locked_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.holder.is_some())
            .count()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: DEFAULT_ENTRY_TTL,
        }
    }
}

fn acquire_locked(
    entries: &mut HashMap<TargetId, RegistryEntry>,
    target_id: &TargetId,
    agent_id: &AgentId,
    position: GridPosition,
    now: u64,
) -> AcquireOutcome {
    match entries.get_mut(target_id) {
        None => {
            entries.insert(
                target_id.clone(),
                RegistryEntry::new(
                    target_id.clone(),
                    position,
                    Some(agent_id.clone()),
                    agent_id.clone(),
                    now,
                ),
            );
            metrics::counter!("overwatch_locks_acquired_total").increment(1);
            info!(target = %target_id, agent = %agent_id, "Pursuit lock acquired");
            AcquireOutcome::Acquired
        }
        Some(entry) => match entry.holder.clone() {
            None => {
                entry.touch(agent_id, position, now);
                entry.holder = Some(agent_id.clone());
                entry.warning_only = false;
                metrics::counter!("overwatch_locks_acquired_total").increment(1);
                info!(target = %target_id, agent = %agent_id, "Pursuit lock acquired from warning");
                AcquireOutcome::Acquired
            }
            Some(holder) if &holder == agent_id => {
                entry.touch(agent_id, position, now);
                AcquireOutcome::Reaffirmed
            }
            Some(holder) => {
                entry.touch(agent_id, position, now);
                metrics::counter!("overwatch_lock_contentions_total").increment(1);
                debug!(target = %target_id, agent = %agent_id, holder = %holder, "Pursuit lock contended");
                AcquireOutcome::Contended { holder }
            }
        },
    }
}

fn release_locked(
    entries: &mut HashMap<TargetId, RegistryEntry>,
    target_id: &TargetId,
    agent_id: &AgentId,
    now: u64,
) -> bool {
    match entries.get_mut(target_id) {
        Some(entry) if entry.holder.as_ref() == Some(agent_id) => {
            entry.holder = None;
            entry.contributors.push(agent_id.clone());
            entry.updated_at = now;
            metrics::counter!("overwatch_locks_released_total").increment(1);
            info!(target = %target_id, agent = %agent_id, "Pursuit lock released");
            true
        }
        _ => false,
    }
}
